use super::*;
use crate::bank::{AccountStore, Bank, BankError};
use crate::common::MAX_LINE_LENGTH;
use crate::config::{IpRange, NodeConfig, PortRange};
use crate::core::{Account, AccountNumber, Money};
use crate::db::RamAccountDb;
use crate::net::NetError;
use crate::protocol::CAPACITY_RESPONSE;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

type TestServer = ConnectionServer<Bank<RamAccountDb>>;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_config(ip: Ipv4Addr, scan: IpRange, ports: &[u16]) -> NodeConfig {
    let mut conf = NodeConfig::new(ip, 0, PathBuf::from("unused.json"));
    conf.timeout_ms = 500;
    conf.heartbeat_interval_secs = 0;
    conf.scan_ip_ranges = vec![scan];
    conf.scan_port_ranges = ports.iter().map(|p| PortRange::new(*p, *p)).collect();
    conf
}

fn local_config(ip: Ipv4Addr) -> NodeConfig {
    test_config(ip, IpRange::new(ip, ip), &[])
}

async fn start_node(conf: NodeConfig) -> Result<TestServer, NodeError> {
    start_node_with(conf, Arc::new(NoopObserver)).await
}

async fn start_node_with(
    conf: NodeConfig,
    observer: Arc<dyn NodeObserver>,
) -> Result<TestServer, NodeError> {
    let context = Arc::new(NodeContext::new(
        conf,
        Bank::new(RamAccountDb::new())?,
        observer,
    ));
    ConnectionServer::start(context).await
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Result<Client, NodeError> {
        let (read, write) = TcpStream::connect(addr).await?.into_split();
        Ok(Client {
            lines: BufReader::new(read).lines(),
            write,
        })
    }

    async fn recv(&mut self) -> Result<Option<String>, NodeError> {
        Ok(timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .map_err(NetError::from)??)
    }

    async fn send(&mut self, line: &str) -> Result<String, NodeError> {
        self.write
            .write_all(format!("{}\n", line).as_bytes())
            .await?;
        self.recv()
            .await?
            .ok_or(NodeError::NetError(NetError::ConnectionClosed))
    }

    async fn create_account(&mut self, ip: Ipv4Addr) -> Result<AccountNumber, NodeError> {
        let resp = self.send("AC").await?;
        let number = resp
            .strip_prefix("AC ")
            .and_then(|r| r.strip_suffix(&format!("/{}", ip)))
            .and_then(|n| n.parse().ok());
        match number {
            Some(number) => Ok(number),
            None => panic!("unexpected AC response: {}", resp),
        }
    }

    async fn fund(&mut self, ip: Ipv4Addr, balances: &[Money]) -> Result<(), NodeError> {
        for balance in balances {
            let acc = self.create_account(ip).await?;
            assert_eq!(self.send(&format!("AD {}/{} {}", acc, ip, balance)).await?, "AD");
        }
        Ok(())
    }
}

async fn wait_until<F: Fn() -> bool>(f: F) -> bool {
    for _ in 0..100 {
        if f() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_local_account_flow() -> Result<(), NodeError> {
    init();
    let ip = Ipv4Addr::LOCALHOST;
    let node = start_node(local_config(ip)).await?;
    let mut client = Client::connect(node.local_addr()).await?;

    assert_eq!(client.send("BC").await?, "BC 127.0.0.1");
    assert_eq!(client.send("  bc  ").await?, "BC 127.0.0.1");

    let acc = client.create_account(ip).await?;
    let missing = if acc == 10000 { 10001 } else { 10000 };

    assert_eq!(client.send(&format!("AD {}/127.0.0.1 300", acc)).await?, "AD");
    assert_eq!(client.send(&format!("ab {}/127.0.0.1", acc)).await?, "AB 300");
    assert_eq!(
        client.send(&format!("AW {}/127.0.0.1 500", acc)).await?,
        "ER AW Failed: Insufficient funds"
    );
    assert_eq!(client.send(&format!("AW {}/127.0.0.1 100", acc)).await?, "AW");
    assert_eq!(
        client.send(&format!("AR {}/127.0.0.1", acc)).await?,
        "ER AR Failed: Balance must be 0"
    );
    assert_eq!(client.send("BA").await?, "BA 200");
    assert_eq!(client.send("BN").await?, "BN 1");

    for bad in [
        format!("AD {}/127.0.0.1 0", acc),
        format!("AD {}/127.0.0.1 -5", acc),
        format!("AD {}/127.0.0.1 ten", acc),
        format!("AD {}/127.0.0.1", acc),
        "AD nonsense 5".to_string(),
        "AD".to_string(),
    ] {
        assert_eq!(client.send(&bad).await?, "ER AD Failed: Invalid arguments");
    }
    assert_eq!(
        client.send(&format!("AB {}/127.0.0.1", missing)).await?,
        "ER AB Failed: Account not found"
    );
    assert_eq!(
        client.send(&format!("AD {}/127.0.0.1 5", missing)).await?,
        "ER AD Failed: Account not found"
    );
    assert_eq!(client.send("XYZ 1 2").await?, "ER command not found: XYZ");

    // Blank lines get no answer.
    assert_eq!(client.send("\n   \nBN").await?, "BN 1");

    assert_eq!(client.send(&format!("AW {}/127.0.0.1 200", acc)).await?, "AW");
    assert_eq!(client.send(&format!("AR {}/127.0.0.1", acc)).await?, "AR");
    assert_eq!(client.send("BN").await?, "BN 0");
    assert_eq!(client.send("BA").await?, "BA 0");

    for bad in ["RP", "RP 0", "RP -1", "RP lots"] {
        assert_eq!(client.send(bad).await?, "ER RP Failed: Invalid target amount");
    }

    node.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_robbery_without_peers() -> Result<(), NodeError> {
    init();
    let node = start_node(local_config(Ipv4Addr::LOCALHOST)).await?;
    let mut client = Client::connect(node.local_addr()).await?;
    assert_eq!(client.send("RP 50").await?, "ER no other bank nodes were found");
    node.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_remote_account() -> Result<(), NodeError> {
    init();
    let node = start_node(local_config(Ipv4Addr::LOCALHOST)).await?;
    let mut client = Client::connect(node.local_addr()).await?;
    assert_eq!(
        client.send("AB 12345/10.255.255.1").await?,
        "ER Unable to connect to 10.255.255.1: no open port found"
    );
    node.stop().await;
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_remote_account_forwarding() -> Result<(), NodeError> {
    init();
    let remote_ip = Ipv4Addr::new(127, 0, 0, 2);
    let remote = start_node(local_config(remote_ip)).await?;
    let local = start_node(test_config(
        Ipv4Addr::LOCALHOST,
        IpRange::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST),
        &[remote.local_addr().port()],
    ))
    .await?;

    let mut remote_client = Client::connect(remote.local_addr()).await?;
    let acc = remote_client.create_account(remote_ip).await?;

    let mut client = Client::connect(local.local_addr()).await?;
    assert_eq!(client.send(&format!("AD {}/127.0.0.2 100", acc)).await?, "AD");
    assert_eq!(client.send(&format!("ab {}/127.0.0.2", acc)).await?, "AB 100");
    assert_eq!(
        client.send(&format!("AW {}/127.0.0.2 1000", acc)).await?,
        "ER AW Failed: Insufficient funds"
    );
    assert_eq!(
        client.send(&format!("AR {}/127.0.0.2", acc)).await?,
        "ER AR Failed: Balance must be 0"
    );
    assert_eq!(
        client.send(&format!("AD {}/127.0.0.2 0", acc)).await?,
        "ER AD Failed: Invalid arguments"
    );

    assert_eq!(remote_client.send("BA").await?, "BA 100");
    assert_eq!(client.send("BN").await?, "BN 0");

    local.stop().await;
    remote.stop().await;
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_robbery_plan_across_nodes() -> Result<(), NodeError> {
    init();
    let ips = [
        Ipv4Addr::new(127, 0, 0, 2),
        Ipv4Addr::new(127, 0, 0, 3),
        Ipv4Addr::new(127, 0, 0, 4),
    ];
    let balances: [&[Money]; 3] = [&[40, 40], &[30], &[20, 20, 20, 20, 20]];

    let mut peers = Vec::new();
    for (ip, funds) in ips.iter().zip(balances.iter()) {
        let peer = start_node(local_config(*ip)).await?;
        Client::connect(peer.local_addr())
            .await?
            .fund(*ip, funds)
            .await?;
        peers.push(peer);
    }
    let ports = peers
        .iter()
        .map(|p| p.local_addr().port())
        .collect::<Vec<_>>();

    // 127.0.0.5 answers the probe with a refusal but runs no bank node.
    let planner = start_node(test_config(
        Ipv4Addr::LOCALHOST,
        IpRange::new(Ipv4Addr::LOCALHOST, Ipv4Addr::new(127, 0, 0, 5)),
        &ports,
    ))
    .await?;
    let mut client = Client::connect(planner.local_addr()).await?;

    assert_eq!(
        client.send("RP 100").await?,
        "RP To obtain 100 you will need to rob 127.0.0.2,127.0.0.3 affecting 3 clients."
    );
    assert_eq!(
        client.send("rp 70").await?,
        "RP To obtain 70 you will need to rob 127.0.0.2 affecting 2 clients."
    );
    assert_eq!(
        client.send("RP 1000").await?,
        "RP Plan will fail: Insufficient funds in the network"
    );

    planner.stop().await;
    for peer in peers {
        peer.stop().await;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_robbery_finds_peers_at_the_end_of_a_wide_range() -> Result<(), NodeError> {
    init();
    let ips = [Ipv4Addr::new(127, 0, 0, 250), Ipv4Addr::new(127, 0, 0, 251)];
    let mut peers = Vec::new();
    for ip in ips.iter() {
        let peer = start_node(local_config(*ip)).await?;
        Client::connect(peer.local_addr())
            .await?
            .fund(*ip, &[60])
            .await?;
        peers.push(peer);
    }

    // Ten candidate ports on every host of a /24: querying all hosts at
    // once would need thousands of sockets.
    let mut ports = peers
        .iter()
        .map(|p| p.local_addr().port())
        .collect::<Vec<_>>();
    while ports.len() < 10 {
        let spare = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        ports.push(spare.local_addr()?.port());
    }

    let planner = start_node(test_config(
        Ipv4Addr::LOCALHOST,
        IpRange::new(Ipv4Addr::new(127, 0, 0, 1), Ipv4Addr::new(127, 0, 0, 254)),
        &ports,
    ))
    .await?;
    let mut client = Client::connect(planner.local_addr()).await?;
    assert_eq!(
        client.send("RP 100").await?,
        "RP To obtain 100 you will need to rob 127.0.0.250,127.0.0.251 affecting 2 clients."
    );

    planner.stop().await;
    for peer in peers {
        peer.stop().await;
    }
    Ok(())
}

#[tokio::test]
async fn test_overlong_line_closes_session() -> Result<(), NodeError> {
    init();
    let stats = Arc::new(NodeStats::default());
    let node = start_node_with(local_config(Ipv4Addr::LOCALHOST), stats.clone()).await?;

    let mut client = Client::connect(node.local_addr()).await?;
    let padded = format!("BC{}", " ".repeat(MAX_LINE_LENGTH - 2));
    assert_eq!(client.send(&padded).await?, "BC 127.0.0.1");

    let _ = client
        .write
        .write_all("A".repeat(MAX_LINE_LENGTH * 2).as_bytes())
        .await;
    let closed = timeout(READ_TIMEOUT, client.lines.next_line())
        .await
        .map_err(NetError::from)?;
    // Either a clean close or a reset, never a response.
    assert!(!matches!(closed, Ok(Some(_))));
    assert!(wait_until(|| stats.active_sessions() == 0).await);

    let mut other = Client::connect(node.local_addr()).await?;
    assert_eq!(other.send("BN").await?, "BN 0");
    node.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_capacity_rejection() -> Result<(), NodeError> {
    init();
    let mut conf = local_config(Ipv4Addr::LOCALHOST);
    conf.max_connections = 1;
    let stats = Arc::new(NodeStats::default());
    let node = start_node_with(conf, stats.clone()).await?;

    let mut first = Client::connect(node.local_addr()).await?;
    assert_eq!(first.send("BC").await?, "BC 127.0.0.1");

    let started = Instant::now();
    let mut second = Client::connect(node.local_addr()).await?;
    assert_eq!(second.recv().await?, Some(CAPACITY_RESPONSE.to_string()));
    assert_eq!(node.active_sessions().await, 1);
    assert_eq!(stats.rejected_sessions(), 1);

    assert_eq!(second.recv().await?, None);
    assert!(started.elapsed() >= Duration::from_secs(4));

    assert_eq!(first.send("BN").await?, "BN 0");
    node.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_closes_sessions_and_listener() -> Result<(), NodeError> {
    init();
    let node = start_node(local_config(Ipv4Addr::LOCALHOST)).await?;
    let addr = node.local_addr();
    let mut client = Client::connect(addr).await?;
    assert_eq!(client.send("BC").await?, "BC 127.0.0.1");
    let sessions = node.sessions().await;
    assert_eq!(sessions.len(), 1);

    node.stop().await;
    assert_eq!(client.recv().await?, None);
    assert_eq!(sessions[0].state(), SessionState::Closed);
    assert_eq!(node.active_sessions().await, 0);
    assert!(TcpStream::connect(addr).await.is_err());

    node.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_session_stop_is_idempotent() -> Result<(), NodeError> {
    init();
    let context = Arc::new(NodeContext::new(
        local_config(Ipv4Addr::LOCALHOST),
        Bank::new(RamAccountDb::new())?,
        Arc::new(NoopObserver) as Arc<dyn NodeObserver>,
    ));
    let processor = Arc::new(CommandProcessor::new(context));
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;

    // Stopped while the client hangs up on its own.
    let mut client = Client::connect(addr).await?;
    let (stream, remote) = listener.accept().await?;
    let session = Arc::new(Session::new(1, stream, remote));
    assert_eq!(session.state(), SessionState::Created);
    let task = tokio::spawn({
        let session = Arc::clone(&session);
        let processor = Arc::clone(&processor);
        async move { session.run(processor).await }
    });
    assert_eq!(client.send("BC").await?, "BC 127.0.0.1");
    assert_eq!(session.state(), SessionState::Running);

    drop(client);
    let stoppers = (0..2)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.stop() })
        })
        .collect::<Vec<_>>();
    for stopper in stoppers {
        stopper.await.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    }
    timeout(READ_TIMEOUT, task)
        .await
        .map_err(NetError::from)?
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    assert_eq!(session.state(), SessionState::Closed);
    session.stop();
    assert_eq!(session.state(), SessionState::Closed);

    // Stopped before it ever ran.
    let mut client = Client::connect(addr).await?;
    let (stream, remote) = listener.accept().await?;
    let session = Session::new(2, stream, remote);
    session.stop();
    assert_eq!(session.state(), SessionState::Closed);
    session.run(processor).await;
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(client.recv().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_observer_counts_sessions() -> Result<(), NodeError> {
    init();
    let stats = Arc::new(NodeStats::default());
    let node = start_node_with(local_config(Ipv4Addr::LOCALHOST), stats.clone()).await?;

    let mut client = Client::connect(node.local_addr()).await?;
    assert_eq!(client.send("BC").await?, "BC 127.0.0.1");
    assert_eq!(client.send("NOPE").await?, "ER command not found: NOPE");
    assert_eq!(stats.active_sessions(), 1);
    assert_eq!(stats.total_sessions(), 1);
    assert_eq!(stats.executed_commands(), 1);

    drop(client);
    assert!(wait_until(|| stats.active_sessions() == 0).await);
    assert_eq!(node.active_sessions().await, 0);
    node.stop().await;
    Ok(())
}

/// Store whose every operation misbehaves.
struct BrokenStore;

impl AccountStore for BrokenStore {
    fn create_account(&self) -> Result<AccountNumber, BankError> {
        Err(BankError::Exhausted)
    }
    fn deposit(&self, _number: AccountNumber, _amount: Money) -> Result<(), BankError> {
        Err(BankError::AccountNotFound)
    }
    fn withdraw(&self, _number: AccountNumber, _amount: Money) -> Result<(), BankError> {
        Err(BankError::AccountNotFound)
    }
    fn get_balance(&self, _number: AccountNumber) -> Result<Money, BankError> {
        Err(BankError::AccountNotFound)
    }
    fn delete_account(&self, _number: AccountNumber) -> Result<(), BankError> {
        Err(BankError::AccountNotFound)
    }
    fn list_all(&self) -> Result<Vec<Account>, BankError> {
        Ok(Vec::new())
    }
    fn total_balance(&self) -> Result<Money, BankError> {
        panic!("ledger exploded")
    }
    fn client_count(&self) -> Result<usize, BankError> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_handler_faults_become_internal_errors() {
    init();
    let processor = CommandProcessor::new(Arc::new(NodeContext::new(
        local_config(Ipv4Addr::LOCALHOST),
        BrokenStore,
        Arc::new(NoopObserver),
    )));

    assert_eq!(
        processor.process_line("AC").await,
        Some("ER Internal server error".to_string())
    );
    assert_eq!(
        processor.process_line("BA").await,
        Some("ER Internal server error".to_string())
    );
    assert_eq!(
        processor.process_line("AB 12345/127.0.0.1").await,
        Some("ER AB Failed: Account not found".to_string())
    );
    assert_eq!(processor.process_line("   ").await, None);
    assert_eq!(
        processor.process_line("BC").await,
        Some("BC 127.0.0.1".to_string())
    );
}
