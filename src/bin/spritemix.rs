use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use spritemix::{
    Category, CreatorSession, FsSheetSource, MessageTransport, OriginPolicy, SessionOpts,
    SheetRgba, SpriteMixResult, SpriteUpdate,
};

#[derive(Parser, Debug)]
#[command(name = "spritemix", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the composite sprite sheet and write it as a PNG.
    Compose(ComposeArgs),
    /// Render one preview frame of the walk animation as a PNG.
    Frame(FrameArgs),
    /// Randomize a character, export it, and write the host payload JSON.
    Send(SendArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Asset directory (catalog JSON plus per-category image folders).
    #[arg(long)]
    assets: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Pin a category to an item index, e.g. `--set body=1`. Repeatable.
    #[arg(long = "set", value_name = "CATEGORY=INDEX")]
    set: Vec<String>,

    /// Randomize unpinned categories.
    #[arg(long)]
    randomize: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Asset directory (catalog JSON plus per-category image folders).
    #[arg(long)]
    assets: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Host ticks to advance the animation clock before rendering.
    #[arg(long, default_value_t = 0)]
    tick: u32,

    /// Pin a category to an item index, e.g. `--set body=1`. Repeatable.
    #[arg(long = "set", value_name = "CATEGORY=INDEX")]
    set: Vec<String>,

    /// Randomize unpinned categories.
    #[arg(long)]
    randomize: bool,
}

#[derive(Parser, Debug)]
struct SendArgs {
    /// Asset directory (catalog JSON plus per-category image folders).
    #[arg(long)]
    assets: PathBuf,

    /// Output payload JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Trusted destination origin recorded alongside the payload.
    #[arg(long)]
    origin: Option<String>,

    /// Permit the wildcard '*' destination when no origin is given.
    #[arg(long)]
    allow_wildcard: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Send(args) => cmd_send(args),
    }
}

fn parse_set(pairs: &[String]) -> anyhow::Result<Vec<(Category, usize)>> {
    pairs
        .iter()
        .map(|pair| {
            let (name, index) = pair
                .split_once('=')
                .with_context(|| format!("expected CATEGORY=INDEX, got '{pair}'"))?;
            let category = Category::parse(name)
                .with_context(|| format!("unknown category '{name}'"))?;
            let index: usize = index
                .parse()
                .with_context(|| format!("invalid index in '{pair}'"))?;
            Ok((category, index))
        })
        .collect()
}

fn build_session(
    assets: &Path,
    set: &[String],
    randomize: bool,
    origin: OriginPolicy,
) -> anyhow::Result<(CreatorSession, FsSheetSource)> {
    let mut source = FsSheetSource::new(assets);
    let opts = SessionOpts {
        randomize_on_start: randomize,
        origin,
        ..SessionOpts::default()
    };
    let mut session = CreatorSession::initialize(&mut source, opts)
        .with_context(|| format!("initialize from '{}'", assets.display()))?;

    for (category, index) in parse_set(set)? {
        session.set_part(&mut source, category, index)?;
    }

    settle_loads(&mut session, &mut source);
    Ok((session, source))
}

/// Pump until nothing is pending. Filesystem loads resolve on the first
/// poll; the bound guards against a source that never settles.
fn settle_loads(session: &mut CreatorSession, source: &mut FsSheetSource) {
    for _ in 0..1024 {
        if session.pump_loads(source).still_pending == 0 {
            break;
        }
    }
}

fn write_out(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let (mut session, _source) =
        build_session(&args.assets, &args.set, args.randomize, OriginPolicy::default())?;

    let outcome = session.rebuild_composite();
    eprintln!(
        "composited {} layers ({} skipped)",
        outcome.layers_drawn, outcome.layers_skipped
    );

    let png = spritemix::encode_composite(session.composite())?;
    write_out(&args.out, &png)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (mut session, _source) =
        build_session(&args.assets, &args.set, args.randomize, OriginPolicy::default())?;

    for _ in 0..args.tick {
        session.tick();
    }

    let geometry = session.composite().geometry();
    let scale = 3u32;
    let mut surface =
        SheetRgba::transparent(geometry.frame_width * scale, geometry.frame_height * scale);
    session.render_preview(&mut surface, std::time::Duration::ZERO);

    let png = spritemix::encode_png(&surface)?;
    write_out(&args.out, &png)
}

fn cmd_send(args: SendArgs) -> anyhow::Result<()> {
    let origin = OriginPolicy {
        trusted: args.origin.clone(),
        allow_wildcard: args.allow_wildcard,
    };
    let (mut session, _source) = build_session(&args.assets, &[], true, origin)?;

    let mut transport = FileTransport {
        path: args.out.clone(),
    };
    session.send_to_host(&mut transport)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

/// File-backed stand-in for the postMessage channel: serializes the payload
/// JSON to a path.
struct FileTransport {
    path: PathBuf,
}

impl MessageTransport for FileTransport {
    fn post(&mut self, payload: &SpriteUpdate, destination_origin: &str) -> SpriteMixResult<()> {
        let json = serde_json::to_vec_pretty(payload)
            .map_err(|e| spritemix::SpriteMixError::export_encoding(format!("serialize payload: {e}")))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
        }
        std::fs::write(&self.path, json).map_err(anyhow::Error::from)?;
        tracing::info!(origin = destination_origin, "payload delivered");
        Ok(())
    }
}
