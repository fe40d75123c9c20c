use ringkv::{DataNode, NodeConfig};
use std::net::SocketAddr;

struct NodeArgs {
    bind_addr: SocketAddr,
}

fn parse_args(args: &[String]) -> Option<NodeArgs> {
    let mut bind_addr = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    Some(NodeArgs {
        bind_addr: bind_addr?,
    })
}

#[tokio::main]
async fn main() -> ringkv::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(parsed) = parse_args(&args) else {
        eprintln!("Usage: {} --bind <addr:port>", args[0]);
        std::process::exit(1);
    };

    let node = DataNode::launch(NodeConfig::new(parsed.bind_addr)).await?;

    tracing::info!(addr = %node.local_addr(), "data node running, press Ctrl+C to shut down");
    tokio::signal::ctrl_c().await.ok();
    node.shutdown().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_bind_parses() {
        let parsed = parse_args(&argv(&["ringkv-node", "--bind", "127.0.0.1:9800"])).unwrap();
        assert_eq!(parsed.bind_addr.port(), 9800);
    }

    #[test]
    fn test_flag_without_value_is_rejected() {
        assert!(parse_args(&argv(&["ringkv-node", "--bind"])).is_none());
    }

    #[test]
    fn test_unparsable_bind_is_rejected() {
        assert!(parse_args(&argv(&["ringkv-node", "--bind", "not-an-addr"])).is_none());
    }
}
