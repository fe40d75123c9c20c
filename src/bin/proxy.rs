use ringkv::{ProxyConfig, ProxyServer};
use std::net::SocketAddr;

struct ProxyArgs {
    bind_addr: SocketAddr,
    nodes: Vec<String>,
    virtual_factor: usize,
}

fn parse_args(args: &[String]) -> Option<ProxyArgs> {
    let mut bind_addr = None;
    let mut nodes = Vec::new();
    let mut virtual_factor = ringkv::DEFAULT_VIRTUAL_FACTOR;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "--node" => {
                nodes.push(args.get(i + 1)?.clone());
                i += 2;
            }
            "--vnodes" => {
                virtual_factor = args.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    Some(ProxyArgs {
        bind_addr: bind_addr?,
        nodes,
        virtual_factor,
    })
}

#[tokio::main]
async fn main() -> ringkv::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(parsed) = parse_args(&args) else {
        eprintln!(
            "Usage: {} --bind <addr:port> --node <addr:port> [--node <addr:port> ...] [--vnodes <n>]",
            args[0]
        );
        std::process::exit(1);
    };

    let config = ProxyConfig::new(parsed.bind_addr)
        .with_nodes(parsed.nodes)
        .with_virtual_factor(parsed.virtual_factor);
    let proxy = ProxyServer::launch(config).await?;

    tracing::info!(addr = %proxy.local_addr(), "proxy running, press Ctrl+C to shut down");
    tokio::signal::ctrl_c().await.ok();
    proxy.shutdown().await;

    Ok(())
}
