use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use log::warn;

use crate::blockchain::Block;
use crate::transaction::Transaction;

/// The three persisted records: chain, pending pool, peer list.
#[derive(Debug)]
pub struct PersistedState {
    pub chain: Vec<Block>,
    pub pending: Vec<Transaction>,
    pub peers: HashSet<String>,
}

/// Load the snapshot written by `save_state`. A missing file yields `None`
/// silently (first boot); a truncated or corrupt one yields `None` with a
/// warning, and the node starts from genesis.
pub fn load_state(path: &Path) -> Option<PersistedState> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!("could not open {}: {err}", path.display());
            return None;
        }
    };
    let mut lines = BufReader::new(file).lines();
    let chain: Vec<Block> = parse_record(lines.next(), "chain", path)?;
    let pending: Vec<Transaction> = parse_record(lines.next(), "pending pool", path)?;
    let peers: Vec<String> = parse_record(lines.next(), "peer list", path)?;
    Some(PersistedState {
        chain,
        pending,
        peers: peers.into_iter().collect(),
    })
}

fn parse_record<T: serde::de::DeserializeOwned>(
    line: Option<io::Result<String>>,
    what: &str,
    path: &Path,
) -> Option<T> {
    let line = match line {
        Some(Ok(line)) => line,
        Some(Err(err)) => {
            warn!("could not read {} from {}: {err}", what, path.display());
            return None;
        }
        None => {
            warn!("snapshot {} is missing its {} record", path.display(), what);
            return None;
        }
    };
    match serde_json::from_str(&line) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("snapshot {} has a corrupt {} record: {err}", path.display(), what);
            None
        }
    }
}

/// Rewrite the whole snapshot: one JSON line each for the chain, the
/// pending pool and the (sorted) peer list. Written to a temp file and
/// renamed into place so a crash mid-write never leaves a torn snapshot.
pub fn save_state(
    path: &Path,
    chain: &[Block],
    pending: &[Transaction],
    peers: &HashSet<String>,
) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer(&mut file, chain)?;
        writeln!(file)?;
        serde_json::to_writer(&mut file, pending)?;
        writeln!(file)?;
        let mut peer_list: Vec<&String> = peers.iter().collect();
        peer_list.sort();
        serde_json::to_writer(&mut file, &peer_list)?;
        writeln!(file)?;
    }
    fs::rename(&tmp, path)
}
