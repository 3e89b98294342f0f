//! gpod-ls
//!
//! Print the contents of a mounted iPod: device, tracks, playlists, photos.

use anyhow::{Context, Result};
use clap::Parser;
use gpod_rs::{Device, GpodError, Itdb, PhotoDb, Playlist, Track};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(name = "gpod-ls")]
#[command(about = "List the tracks, playlists and photos of a mounted iPod")]
struct Args {
    /// Where the iPod is mounted
    mountpoint: PathBuf,

    /// Skip the photo database
    #[arg(long)]
    no_photos: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Print one JSON document instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DeviceSummary {
    mountpoint: Option<PathBuf>,
    model: Option<String>,
    generation: Option<String>,
    supports_artwork: bool,
    supports_photo: bool,
    supports_video: bool,
    supports_podcast: bool,
    supports_chapter_image: bool,
}

#[derive(Serialize)]
struct TrackSummary {
    artist: Option<String>,
    album: Option<String>,
    title: Option<String>,
    remember_playback_position: bool,
    time_added: String,
}

#[derive(Serialize)]
struct PlaylistSummary {
    name: Option<String>,
    master: bool,
    tracks: usize,
}

#[derive(Serialize)]
struct PhotoSummary {
    photos: Vec<u32>,
    albums: Vec<PlaylistSummary>,
}

#[derive(Serialize)]
struct Listing {
    device: Option<DeviceSummary>,
    tracks: Vec<TrackSummary>,
    playlists: Vec<PlaylistSummary>,
    photos: Option<PhotoSummary>,
}

fn device_summary(device: &Device) -> DeviceSummary {
    let info = device.ipod_info();
    DeviceSummary {
        mountpoint: device.mountpoint(),
        model: info.and_then(|i| i.model_name()),
        generation: info.and_then(|i| i.generation_name()),
        supports_artwork: device.supports_artwork(),
        supports_photo: device.supports_photo(),
        supports_video: device.supports_video(),
        supports_podcast: device.supports_podcast(),
        supports_chapter_image: device.supports_chapter_image(),
    }
}

fn track_summary(track: &Track) -> TrackSummary {
    TrackSummary {
        artist: track.artist(),
        album: track.album(),
        title: track.title(),
        remember_playback_position: track.remember_playback_position(),
        time_added: track.time_added().to_string(),
    }
}

fn playlist_summary(playlist: &Playlist) -> PlaylistSummary {
    PlaylistSummary {
        name: playlist.name(),
        master: playlist.is_master(),
        tracks: playlist.track_count(),
    }
}

fn photo_summary(db: &PhotoDb) -> PhotoSummary {
    PhotoSummary {
        photos: db.photos().iter().map(|p| p.id()).collect(),
        albums: db
            .photo_albums()
            .iter()
            .map(|a| PlaylistSummary {
                name: a.name(),
                master: a.is_photo_library(),
                tracks: a.photos().len(),
            })
            .collect(),
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("?")
}

fn print_text(listing: &Listing) {
    if let Some(dev) = &listing.device {
        let mountpoint = dev.mountpoint.as_ref().map(|m| m.display().to_string());
        println!("Device:      {}", or_unknown(&mountpoint));
        println!("Model:       {}", or_unknown(&dev.model));
        println!("Generation:  {}", or_unknown(&dev.generation));
        println!(
            "Supports:    artwork={} photo={} video={} podcast={} chapter-image={}",
            dev.supports_artwork, dev.supports_photo, dev.supports_video, dev.supports_podcast, dev.supports_chapter_image
        );
    }

    println!();
    println!("Tracks ({}):", listing.tracks.len());
    for t in &listing.tracks {
        println!(
            "  {} / {} / {}{}  added {}",
            or_unknown(&t.artist),
            or_unknown(&t.album),
            or_unknown(&t.title),
            if t.remember_playback_position { " [resume]" } else { "" },
            t.time_added
        );
    }

    println!();
    println!("Playlists ({}):", listing.playlists.len());
    for pl in &listing.playlists {
        let marker = if pl.master { " (Master)" } else { "" };
        println!("  {}{}: {} tracks", or_unknown(&pl.name), marker, pl.tracks);
    }

    if let Some(photos) = &listing.photos {
        println!();
        println!("Photos ({}):", photos.photos.len());
        for album in &photos.albums {
            let marker = if album.master { " (Library)" } else { "" };
            println!("  {}{}: {} photos", or_unknown(&album.name), marker, album.tracks);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let db = Itdb::parse(&args.mountpoint)
        .with_context(|| format!("reading iTunes database at {}", args.mountpoint.display()))?;

    let photos = if args.no_photos {
        None
    } else {
        match PhotoDb::parse(&args.mountpoint) {
            Ok(photodb) => Some(photo_summary(&photodb)),
            Err(GpodError::Native(e)) => {
                warn!(error = %e, "no photo database");
                println!("No photo database: {e}");
                None
            }
            Err(e) => return Err(e).context("reading photo database"),
        }
    };

    let listing = Listing {
        device: db.device().as_ref().map(device_summary),
        tracks: db.tracks().iter().map(|t| track_summary(&t)).collect(),
        playlists: db.playlists().iter().map(|p| playlist_summary(&p)).collect(),
        photos,
    };
    debug!(tracks = listing.tracks.len(), playlists = listing.playlists.len(), "listing built");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print_text(&listing);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
        Err(e) => {
            print!("{e}");
            return ExitCode::SUCCESS;
        }
    };

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gpod-ls: {e:#}");
            ExitCode::from(1)
        }
    }
}
