use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tier_store::{
    BlockCloser, BlockStore, BlockViewer, FsBlockStore, IdStore, NoOrigin, RemoteOrigin,
    StoreOrigin, StoreResult,
};
use tier_types::{parse_cid, Block, Cid};

use crate::cli::*;
use crate::config::TierConfig;

/// Build the identity-aware store described by `config`.
pub async fn open_store(config: &TierConfig) -> anyhow::Result<IdStore> {
    let local = FsBlockStore::open(&config.local_dir)
        .await
        .with_context(|| format!("opening local store {}", config.local_dir.display()))?;

    let origin: Arc<dyn RemoteOrigin> = match &config.origin_dir {
        Some(dir) => {
            let mirror = FsBlockStore::open(dir)
                .await
                .with_context(|| format!("opening origin {}", dir.display()))?;
            Arc::new(StoreOrigin::new(Arc::new(mirror)))
        }
        None => Arc::new(NoOrigin),
    };

    let store = IdStore::new(Arc::new(local), origin);
    store.hash_on_read(config.hash_on_read);
    tracing::debug!(?store, "store ready");
    Ok(store)
}

pub async fn run_command(cli: Cli, config: TierConfig) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let result = match cli.command {
        Command::Put(args) => cmd_put(&store, args, &cli.format).await,
        Command::Get(args) => cmd_get(&store, args).await,
        Command::Has(args) => cmd_has(&store, args, &cli.format).await,
        Command::Size(args) => cmd_size(&store, args, &cli.format).await,
        Command::Rm(args) => cmd_rm(&store, args).await,
        Command::Ls(args) => cmd_ls(&store, args, &cli.format).await,
    };
    let closed = store.close().await;
    settle(result, closed)
}

/// The command's own error wins; a close failure is reported only after success.
fn settle(result: anyhow::Result<()>, closed: StoreResult<()>) -> anyhow::Result<()> {
    result?;
    closed.context("closing store")?;
    Ok(())
}

/// Read `file` and store it, returning the block's CID.
pub async fn put_file(
    store: &IdStore,
    file: &Path,
    codec: Codec,
    identity: bool,
) -> anyhow::Result<Cid> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let block = if identity {
        Block::identity(codec.code(), data)?
    } else {
        Block::new(codec.code(), data)?
    };
    let cid = *block.cid();
    store.put(block).await?;
    Ok(cid)
}

/// Stream a block's bytes into `out`.
pub async fn read_block(
    store: &IdStore,
    cid: &Cid,
    out: &mut (dyn Write + Send),
) -> anyhow::Result<()> {
    store
        .view(cid, &mut |data: &[u8]| -> StoreResult<()> {
            out.write_all(data)?;
            Ok(())
        })
        .await?;
    Ok(())
}

/// Collect up to `limit` CIDs from the local store.
pub async fn list_cids(store: &IdStore, limit: Option<usize>) -> anyhow::Result<Vec<Cid>> {
    let mut rx = store.all_keys().await?;
    let mut cids = Vec::new();
    while let Some(cid) = rx.recv().await {
        cids.push(cid);
        if limit.is_some_and(|n| cids.len() >= n) {
            break;
        }
    }
    Ok(cids)
}

async fn cmd_put(store: &IdStore, args: PutArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let cid = put_file(store, &args.file, args.codec, args.identity).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "cid": cid.to_string() })),
        OutputFormat::Text => println!("{} {}", "✓".green().bold(), cid.to_string().yellow()),
    }
    Ok(())
}

async fn cmd_get(store: &IdStore, args: GetArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    match &args.output {
        Some(path) => {
            // Nothing touches the output path until the block has been read.
            let mut data = Vec::new();
            read_block(store, &cid, &mut data).await?;
            tokio::fs::write(path, &data)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} wrote {}", "✓".green(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout();
            read_block(store, &cid, &mut stdout).await?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn cmd_has(store: &IdStore, args: CidArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let present = store.has(&cid).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "cid": args.cid, "present": present })),
        OutputFormat::Text if present => println!("{} {}", "✓".green(), args.cid),
        OutputFormat::Text => println!("{} {}", "✗".red(), args.cid),
    }
    Ok(())
}

async fn cmd_size(store: &IdStore, args: CidArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let size = store.get_size(&cid).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "cid": args.cid, "size": size })),
        OutputFormat::Text => println!("{size}"),
    }
    Ok(())
}

async fn cmd_rm(store: &IdStore, args: CidArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    store.delete(&cid).await?;
    println!("Removed {}", args.cid.yellow());
    Ok(())
}

async fn cmd_ls(store: &IdStore, args: LsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let cids = list_cids(store, args.limit).await?;
    match format {
        OutputFormat::Json => {
            let list: Vec<String> = cids.iter().map(Cid::to_string).collect();
            println!("{}", serde_json::to_string(&list)?);
        }
        OutputFormat::Text => {
            for cid in &cids {
                println!("{cid}");
            }
            if cids.is_empty() {
                println!("No blocks.");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tier_store::StoreError;
    use tier_types::is_identity;

    fn config_for(local: &Path, origin: Option<&Path>) -> TierConfig {
        TierConfig {
            local_dir: local.to_path_buf(),
            origin_dir: origin.map(Path::to_path_buf),
            ..TierConfig::default()
        }
    }

    #[tokio::test]
    async fn put_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        std::fs::write(&input, b"file contents").unwrap();

        let store = open_store(&config_for(&dir.path().join("blocks"), None)).await.unwrap();
        let cid = put_file(&store, &input, Codec::Raw, false).await.unwrap();
        assert!(!is_identity(&cid));

        let mut out = Vec::new();
        read_block(&store, &cid, &mut out).await.unwrap();
        assert_eq!(out, b"file contents");
        assert_eq!(list_cids(&store, None).await.unwrap(), vec![cid]);
    }

    #[tokio::test]
    async fn identity_put_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tiny");
        std::fs::write(&input, b"hi").unwrap();

        let store = open_store(&config_for(&dir.path().join("blocks"), None)).await.unwrap();
        let cid = put_file(&store, &input, Codec::DagCbor, true).await.unwrap();
        assert!(is_identity(&cid));
        assert!(list_cids(&store, None).await.unwrap().is_empty());

        let mut out = Vec::new();
        read_block(&store, &cid, &mut out).await.unwrap();
        assert_eq!(out, b"hi");
    }

    #[tokio::test]
    async fn origin_directory_fills_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let local_dir = dir.path().join("local");
        let origin_dir = dir.path().join("origin");

        let mirror = FsBlockStore::open(&origin_dir).await.unwrap();
        let block = Block::new(tier_types::RAW, &b"mirrored"[..]).unwrap();
        mirror.put(block.clone()).await.unwrap();

        let store = open_store(&config_for(&local_dir, Some(&origin_dir))).await.unwrap();
        let mut out = Vec::new();
        read_block(&store, block.cid(), &mut out).await.unwrap();
        assert_eq!(out, b"mirrored");

        // Written back into the local directory.
        let local = FsBlockStore::open(&local_dir).await.unwrap();
        assert!(local.has(block.cid()).await.unwrap());
    }

    #[tokio::test]
    async fn missing_block_without_origin_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&config_for(dir.path(), None)).await.unwrap();
        let cid = tier_types::blake3_cid(tier_types::RAW, b"absent");
        let mut out = Vec::new();
        assert!(read_block(&store, &cid, &mut out).await.is_err());
    }

    #[tokio::test]
    async fn failed_get_leaves_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&config_for(&dir.path().join("blocks"), None)).await.unwrap();
        let out = dir.path().join("out.bin");
        let args = GetArgs {
            cid: tier_types::blake3_cid(tier_types::RAW, b"absent").to_string(),
            output: Some(out.clone()),
        };
        assert!(cmd_get(&store, args).await.is_err());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn get_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&config_for(&dir.path().join("blocks"), None)).await.unwrap();
        let block = Block::new(tier_types::RAW, &b"to disk"[..]).unwrap();
        store.put(block.clone()).await.unwrap();

        let out = dir.path().join("out.bin");
        let args = GetArgs { cid: block.cid().to_string(), output: Some(out.clone()) };
        cmd_get(&store, args).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"to disk");
    }

    #[test]
    fn command_error_wins_over_close_error() {
        let err = settle(Err(anyhow::anyhow!("command failed")), Err(StoreError::Closed))
            .unwrap_err();
        assert_eq!(err.to_string(), "command failed");
    }

    #[test]
    fn close_error_surfaces_after_success() {
        let err = settle(Ok(()), Err(StoreError::Closed)).unwrap_err();
        assert_eq!(err.to_string(), "closing store");
        assert!(settle(Ok(()), Ok(())).is_ok());
    }

    #[tokio::test]
    async fn ls_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&config_for(dir.path(), None)).await.unwrap();
        for i in 0..5u8 {
            store.put(Block::new(tier_types::RAW, vec![i]).unwrap()).await.unwrap();
        }
        assert_eq!(list_cids(&store, Some(2)).await.unwrap().len(), 2);
        assert_eq!(list_cids(&store, None).await.unwrap().len(), 5);
    }
}
