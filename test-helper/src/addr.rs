use std::net::TcpListener;

/// Gets `n` distinct `host:port` endpoints allocated by the OS.
pub fn unused_endpoints(n: usize) -> Vec<String> {
    let listeners = (0..n)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect::<Vec<_>>();

    // The listeners are held until every address is allocated so none repeat.
    listeners
        .iter()
        .map(|listener| listener.local_addr().unwrap().to_string())
        .collect()
}
