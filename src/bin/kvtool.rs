//! Ad hoc inspection of a store directory: `get`, `list`, `dissoc` against a
//! `serde_json`-backed store, via a small interactive console.

use std::io::{stdin, stdout, Write};

use anyhow::{anyhow, Result};
use clap::{crate_version, App, Arg};
use kvault::{Store, StoreOptions, StoreValue};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = App::new("kvtool")
        .version(crate_version!())
        .author("kvault maintainers")
        .arg(
            Arg::with_name("store")
                .long("store")
                .value_name("DIR")
                .default_value("./kvault-data")
                .help("path to the store folder")
                .takes_value(true),
        )
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let folder = matches.value_of("store").unwrap_or_default().to_owned();
    let store = Store::open(&folder, StoreOptions::default()).await?;

    let console = Console { store };
    loop {
        match console.interact().await {
            Ok(true) => break Ok(()),
            Err(err) => eprintln!("{err}"),
            _ => continue,
        }
    }
}

struct Console {
    store: Store,
}

impl Console {
    async fn interact(&self) -> Result<bool> {
        print!("kvtool> ");
        stdout().flush()?;

        let mut buffer = String::new();
        if stdin().read_line(&mut buffer)? == 0 {
            return Ok(true);
        }
        let commands: Vec<&str> = buffer.split_whitespace().collect();
        if commands.is_empty() {
            return Ok(false);
        }

        match commands[0] {
            "exit" | "quit" => return Ok(true),
            "get" => self.get(&commands[1..]).await?,
            "list" => self.list().await?,
            "dissoc" => self.dissoc(&commands[1..]).await?,
            cmd => return Err(anyhow!("unknown command `{cmd}` (try get/list/dissoc/exit)")),
        }

        Ok(false)
    }

    async fn get(&self, args: &[&str]) -> Result<()> {
        let [key] = require_args(args)?;
        let key = StoreValue::Str(key.to_owned());
        match self.store.get_in(&[], &key).await? {
            Some(value) => println!("{value:?}"),
            None => println!("Not Found"),
        }
        Ok(())
    }

    async fn dissoc(&self, args: &[&str]) -> Result<()> {
        let [key] = require_args(args)?;
        let key = StoreValue::Str(key.to_owned());
        self.store.dissoc(&key).await?;
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        for key in self.store.list_keys().await? {
            println!("{key:?}");
        }
        Ok(())
    }
}

fn require_args<'a, const N: usize>(args: &[&'a str]) -> Result<[&'a str; N]> {
    <[&'a str; N]>::try_from(args).map_err(|_| anyhow!("expected {N} argument(s), got {args:?}"))
}
