// SPDX-License-Identifier: MIT

use anyhow::Context as _;
use cardfs::fat32::*;
use colored::Colorize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, Commands, GlobalOptions};
use crate::profile::ProfileFile;
use crate::utils::{hex_dump, pretty_bytes};

pub type ImageCard = MemCard<StdImage<File>>;
pub type Session<'a> = CardSession<CountingTransport<'a, ImageCard>>;

/// Everything needed to bring a card up over an image file.
#[derive(Debug)]
pub struct Context {
    pub image: PathBuf,
    pub partition: u8,
    pub card: CardProfile,
    pub config: BringUpConfig,
}

impl Context {
    pub fn new(image: &Path, options: &GlobalOptions) -> anyhow::Result<Self> {
        let mut profile = match &options.profile {
            Some(path) => ProfileFile::from_file(path)?,
            None => ProfileFile::default(),
        };
        if let Some(kind) = options.card {
            profile.card.kind = kind;
        }
        Ok(Self {
            image: image.to_path_buf(),
            partition: options.partition,
            card: profile.card_profile(),
            config: profile.bring_up(options.speed_hz),
        })
    }
}

/// Brings the emulated card up and hands the session to `f`.
pub fn with_session<R>(
    ctx: &Context,
    f: impl FnOnce(&mut Session<'_>, &CardInfo) -> anyhow::Result<R>,
) -> anyhow::Result<R> {
    let image = StdImage::open(&ctx.image)
        .with_context(|| format!("cannot open image {}", ctx.image.display()))?;
    let mut card = MemCard::new(image, ctx.card);
    let mut session = CardSession::new(CountingTransport::new(&mut card));
    let info = session.bring_up(&ctx.config).context("card bring-up failed")?;

    log::info!(
        "card ready after {} init round(s): {}, {}-byte blocks",
        info.init_rounds,
        describe_capacity(info.capacity),
        info.capacity.block_size()
    );
    if info.capacity == CapacityClass::Standard {
        log::warn!("standard capacity card: block k is read at byte address k << 9");
    }

    let result = f(&mut session, &info);

    let stats = session.into_inner().snapshot();
    log::debug!(
        "transport: {} exchanges, {} commands, {} bytes, {} idle bytes, largest exchange {} bytes",
        stats.exchanges,
        stats.commands,
        stats.bytes,
        stats.idle_bytes,
        stats.max_exchange
    );
    result
}

fn mount<'s, 'c>(
    session: &'s mut Session<'c>,
    partition: u8,
) -> anyhow::Result<Volume<&'s mut Session<'c>>> {
    Volume::mount(session, partition).with_context(|| format!("cannot mount partition {partition}"))
}

fn describe_version(version: CardVersion) -> &'static str {
    match version {
        CardVersion::V2 => "v2",
        CardVersion::Legacy => "legacy (v1)",
    }
}

fn describe_capacity(capacity: CapacityClass) -> &'static str {
    match capacity {
        CapacityClass::High => "high capacity",
        CapacityClass::Standard => "standard capacity",
    }
}

fn heading(out: &mut dyn Write, title: &str) -> anyhow::Result<()> {
    writeln!(out, "{}", title.bold())?;
    Ok(())
}

pub fn info(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    with_session(ctx, |session, card| {
        heading(out, "Card")?;
        writeln!(out, "  interface     : {}", describe_version(card.version))?;
        writeln!(
            out,
            "  capacity      : {} ({}-byte blocks)",
            describe_capacity(card.capacity),
            card.capacity.block_size()
        )?;
        writeln!(out, "  OCR           : {:#010X}", card.ocr)?;
        writeln!(out, "  init rounds   : {}", card.init_rounds)?;
        match card.clock_hz {
            Some(hz) => writeln!(out, "  clock         : {hz} Hz")?,
            None => writeln!(out, "  clock         : unchanged")?,
        }

        let volume = mount(session, ctx.partition)?;
        let part = volume.partition();
        heading(out, &format!("Partition {}", part.index))?;
        writeln!(out, "  type          : {} ({:#04X})", part.kind(), part.part_type)?;
        writeln!(out, "  bootable      : {}", if part.is_bootable() { "yes" } else { "no" })?;
        writeln!(out, "  start LBA     : {}", part.start_lba)?;
        writeln!(
            out,
            "  sectors       : {} ({})",
            part.total_sectors,
            pretty_bytes(part.total_sectors as u64 * 512)
        )?;

        let bpb = volume.bpb();
        let geo = volume.geometry();
        heading(out, "FAT32")?;
        writeln!(out, "  label         : {}", bpb.label().unwrap_or("?"))?;
        writeln!(out, "  volume id     : {:#010X}", bpb.volume_id)?;
        writeln!(out, "  bytes/sector  : {}", bpb.bytes_per_sector)?;
        writeln!(out, "  cluster size  : {}", pretty_bytes(geo.bytes_per_cluster() as u64))?;
        writeln!(out, "  reserved      : {} sectors", geo.reserved_sectors)?;
        writeln!(out, "  FATs          : {} x {} sectors", geo.num_fats, geo.sectors_per_fat)?;
        writeln!(out, "  root cluster  : {}", geo.root_cluster)?;
        writeln!(out, "  FAT region    : LBA {}", geo.fat_region_lba)?;
        writeln!(out, "  data region   : LBA {}", geo.data_region_lba)?;
        writeln!(out, "  clusters      : {}", geo.cluster_count())?;
        Ok(())
    })
}

pub fn ls(
    ctx: &Context,
    path: &str,
    cluster: Option<u32>,
    all: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    with_session(ctx, |session, _| {
        let mut volume = mount(session, ctx.partition)?;
        let entries = match cluster {
            Some(cluster) => volume
                .read_dir(cluster)
                .with_context(|| format!("cannot list cluster {cluster}"))?,
            None => volume
                .read_dir_path(path)
                .with_context(|| format!("cannot list {path}"))?,
        };

        for entry in entries
            .iter()
            .filter(|e| all || !(e.is_volume_label() || e.is_dot_entry()))
        {
            let flags: String = entry.attrs.flags().iter().collect();
            let name = if entry.is_dir() {
                entry.name.blue().bold()
            } else if entry.is_volume_label() {
                entry.name.dimmed()
            } else {
                entry.name.normal()
            };
            writeln!(out, "{flags} {:>8} {:>10} {name}", entry.first_cluster, entry.size)?;
        }
        Ok(())
    })
}

pub fn cat(ctx: &Context, name: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    with_session(ctx, |session, _| {
        let mut volume = mount(session, ctx.partition)?;
        let data = volume
            .read_file_path(name)
            .with_context(|| format!("cannot read {name}"))?;
        out.write_all(&data)?;
        Ok(())
    })
}

pub fn block(ctx: &Context, lba: u32, out: &mut dyn Write) -> anyhow::Result<()> {
    with_session(ctx, |session, _| {
        let mut buf = vec![0u8; session.block_size()];
        session
            .read_block(lba, &mut buf)
            .with_context(|| format!("cannot read block {lba}"))?;
        write!(out, "{}", hex_dump(&buf, lba as u64 * 512))?;
        Ok(())
    })
}

/// Runs one parsed command line, writing results to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let ctx = Context::new(cli.command.image(), &cli.options)?;
    match &cli.command {
        Commands::Info { .. } => info(&ctx, out),
        Commands::Ls { path, cluster, all, .. } => ls(&ctx, path, *cluster, *all, out),
        Commands::Cat { name, .. } => cat(&ctx, name, out),
        Commands::Block { lba, .. } => block(&ctx, *lba, out),
    }
}
