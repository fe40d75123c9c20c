use crate::config::{ClientConfig, NodeConfig, ProxyConfig};
use crate::client::KvClient;
use crate::node::DataNode;
use crate::proxy::ProxyServer;
use crate::types::NodeAddr;

/// A proxy, its data nodes and one connected client, all on OS-assigned
/// ports.
pub(crate) struct TestCluster {
    pub proxy: ProxyServer,
    pub nodes: Vec<DataNode>,
    pub node_addrs: Vec<NodeAddr>,
    pub client: KvClient,
}

impl TestCluster {
    pub(crate) async fn spawn(node_count: usize) -> TestCluster {
        Self::spawn_with_config(node_count, ClientConfig::default()).await
    }

    pub(crate) async fn spawn_with_config(
        node_count: usize,
        client_config: ClientConfig,
    ) -> TestCluster {
        let mut nodes = Vec::with_capacity(node_count);
        let mut node_addrs = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let node = DataNode::launch(NodeConfig::new("127.0.0.1:0".parse().unwrap()))
                .await
                .unwrap();
            node_addrs.push(node.local_addr().to_string());
            nodes.push(node);
        }

        let proxy_config = ProxyConfig::new("127.0.0.1:0".parse().unwrap())
            .with_nodes(node_addrs.clone());
        let proxy = ProxyServer::launch(proxy_config).await.unwrap();

        let client_config = ClientConfig {
            proxy_addr: proxy.local_addr().to_string(),
            ..client_config
        };
        let client = KvClient::connect(client_config).await.unwrap();

        TestCluster {
            proxy,
            nodes,
            node_addrs,
            client,
        }
    }

    /// Total number of keys stored across all nodes.
    pub(crate) fn total_keys(&self) -> usize {
        self.nodes.iter().map(|node| node.key_count()).sum()
    }

    pub(crate) async fn shutdown(&self) {
        self.client.shutdown().await;
        self.proxy.shutdown().await;
        for node in &self.nodes {
            node.shutdown().await;
        }
    }
}
