// Prints every host and fingerprint in a known_hosts file, one per line.
//
//     cargo run -p knownfs-core --example list_fingerprints -- ~/.ssh/known_hosts
use knownfs_core::HostIndexCache;

fn main() {
    let Some(path) = std::env::args_os().nth(1) else {
        eprintln!("usage: list_fingerprints <known_hosts>");
        std::process::exit(2);
    };

    let snapshot = HostIndexCache::new(path).current_index();
    if let Some(err) = snapshot.error() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let mut hosts: Vec<_> = snapshot.index().iter().collect();
    hosts.sort_by(|a, b| a.0.cmp(b.0));
    for (host, fingerprint) in hosts {
        println!("{host} {fingerprint}");
    }
}
