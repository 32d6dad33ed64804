//! # SlotKV Walkthrough
//!
//! Runs the string-command walkthrough against a live server (or cluster) and
//! prints each result, so the documented examples can be checked by eye.
//!
//! ```text
//! skv-walkthrough                       # 127.0.0.1:6379
//! skv-walkthrough client.json           # ClientConfig from JSON
//! skv-walkthrough --cluster nodes.json  # ClusterConfig from JSON
//! RUST_LOG=skv_client=debug skv-walkthrough
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use skv_client::{
    ClientConfig, ClientStatistics, ClusterClient, ClusterConfig, Expiry, GenericCommands,
    GetExOptions, KeyTtl, LcsIdxOptions, Nilable, SetCondition, SetOptions, StandaloneClient,
    StringCommands,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Walk through the SlotKV string commands")]
struct Args {
    /// JSON config file; defaults apply when omitted.
    config: Option<PathBuf>,

    /// Treat the config as a cluster config.
    #[arg(long)]
    cluster: bool,
}

// Every key shares one hash tag so the walkthrough also runs on a cluster.
const NAME: &[u8] = b"{walkthrough}name";
const GREETING: &[u8] = b"{walkthrough}greeting";
const KANJI: &[u8] = b"{walkthrough}kanji";
const COUNTER: &[u8] = b"{walkthrough}counter";
const FLOAT: &[u8] = b"{walkthrough}float";
const TEMP: &[u8] = b"{walkthrough}temp";
const KEY1: &[u8] = b"{walkthrough}key1";
const KEY2: &[u8] = b"{walkthrough}key2";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.cluster {
        let config = match &args.config {
            Some(path) => ClusterConfig::from_json_file(path)
                .with_context(|| format!("loading cluster config {}", path.display()))?,
            None => ClusterConfig::default(),
        };
        info!(nodes = ?config.nodes, "running against cluster");
        let client = ClusterClient::with_config(config)?;
        run(&client)?;
        print_statistics(&client.get_statistics())
    } else {
        let config = match &args.config {
            Some(path) => ClientConfig::from_json_file(path)
                .with_context(|| format!("loading client config {}", path.display()))?,
            None => ClientConfig::default(),
        };
        info!(addr = %config.addr, "running against standalone server");
        let client = StandaloneClient::with_config(config)?;
        run(&client)?;
        print_statistics(&client.get_statistics())
    }
}

fn run<C: StringCommands + GenericCommands>(client: &C) -> anyhow::Result<()> {
    println!("PING -> {}", String::from_utf8_lossy(&client.ping(None)?));
    client.del(&[NAME, GREETING, KANJI, COUNTER, FLOAT, TEMP, KEY1, KEY2])?;

    println!("GET missing -> {}", show(&client.get(NAME)?));
    println!("SET -> {}", client.set(NAME, b"value")?);
    println!("GET -> {}", show(&client.get(NAME)?));

    let only_new = SetOptions {
        condition: Some(SetCondition::OnlyIfDoesNotExist),
        ..SetOptions::default()
    };
    println!(
        "SET NX on existing key -> {}",
        show(&client.set_with_options(NAME, b"other", &only_new)?)
    );

    println!("APPEND -> {}", client.append(GREETING, b"Hello")?);
    println!("APPEND -> {}", client.append(GREETING, b" World")?);
    println!("SETRANGE -> {}", client.set_range(GREETING, 6, b"Redis")?);
    println!("GET -> {}", show(&client.get(GREETING)?));

    client.set(KANJI, "愛".as_bytes())?;
    println!("GETRANGE 0 1 -> {:?}", client.get_range(KANJI, 0, 1)?);
    println!("SETRANGE 1 a -> {}", client.set_range(KANJI, 1, b"a")?);
    println!("GET raw -> {:?}", client.get(KANJI)?.into_value()?);

    println!("INCR -> {}", client.incr(COUNTER)?);
    println!("INCRBY 10 -> {}", client.incr_by(COUNTER, 10)?);
    println!("DECRBY 4 -> {}", client.decr_by(COUNTER, 4)?);
    client.set(FLOAT, b"1")?;
    println!("INCRBYFLOAT 5.5 -> {}", client.incr_by_float(FLOAT, 5.5)?);
    if let Err(err) = client.incr(GREETING) {
        println!("INCR on text -> error: {err}");
    }

    let pairs = [(KEY1, b"ohmytext".as_slice()), (KEY2, b"mynewtext".as_slice())];
    println!("MSETNX -> {}", client.msetnx(&pairs)?);
    println!("MSETNX again -> {}", client.msetnx(&pairs)?);
    let values = client.mget(&[KEY1, TEMP, KEY2])?;
    let shown: Vec<String> = values.iter().map(show).collect();
    println!("MGET -> {shown:?}");

    println!("LCS -> {}", String::from_utf8_lossy(&client.lcs(KEY1, KEY2)?));
    println!("LCS LEN -> {}", client.lcs_len(KEY1, KEY2)?);
    let options = LcsIdxOptions {
        min_match_len: Some(4),
        with_match_len: true,
    };
    let report = client.lcs_with_options(KEY1, KEY2, &options)?;
    println!("LCS IDX MINMATCHLEN 4 WITHMATCHLEN ->\n{}", serde_json::to_string_pretty(&report)?);

    client.set(TEMP, b"short-lived")?;
    let options = GetExOptions::with_expiry(Expiry::Seconds(5));
    println!("GETEX EX 5 -> {}", show(&client.get_ex_with_options(TEMP, &options)?));
    println!("TTL -> {}", describe_ttl(client.ttl(TEMP)?));
    println!("GETDEL -> {}", show(&client.get_del(TEMP)?));
    println!("GETDEL again -> {}", show(&client.get_del(TEMP)?));

    info!("walkthrough finished");
    Ok(())
}

fn print_statistics(stats: &ClientStatistics) -> anyhow::Result<()> {
    println!("connection pools ->\n{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

fn show(value: &Nilable<Vec<u8>>) -> String {
    match value.to_string_lossy() {
        Some(text) => format!("{text:?}"),
        None => "<nil>".to_string(),
    }
}

fn describe_ttl(ttl: KeyTtl) -> String {
    match ttl {
        KeyTtl::Missing => "missing".to_string(),
        KeyTtl::NoExpiry => "no expiry".to_string(),
        KeyTtl::ExpiresIn(left) => format!("{}s", left.as_secs()),
    }
}
