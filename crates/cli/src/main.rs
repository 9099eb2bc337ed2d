mod ivf;

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;
use vp8rtp::media::bitstream::{is_keyframe, parse_keyframe_header};
use vp8rtp::media::fragmenter::DEFAULT_FRAGMENT_SIZE;
use vp8rtp::media::rtp::{DEFAULT_PAYLOAD_TYPE, RtpHeader, parse_rtp};
use vp8rtp::media::rtp_timestamp;
use vp8rtp::{Fragmenter, PartitionInfo, Reassembler, Result, Vp8Error};

use ivf::IvfReader;

#[derive(Parser)]
#[command(
    name = "vp8-rtp",
    about = "Inspect VP8 IVF files and run them through the RTP payload layer"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List frames with keyframe header details
    Probe {
        input: PathBuf,
    },
    /// Report how frames split into fragments
    Packetize {
        input: PathBuf,
        /// Maximum fragment payload in bytes (descriptor excluded)
        #[arg(long, short, default_value_t = DEFAULT_FRAGMENT_SIZE)]
        mtu: usize,
    },
    /// Fragment, send through an in-memory RTP link, and reassemble
    Loopback {
        input: PathBuf,
        /// Maximum fragment payload in bytes (descriptor excluded)
        #[arg(long, short, default_value_t = DEFAULT_FRAGMENT_SIZE)]
        mtu: usize,
        /// Probability of dropping each datagram, 0.0 to 1.0
        #[arg(long, default_value_t = 0.0)]
        loss: f64,
        /// Seed for the loss pattern
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Probe { input } => probe(&input),
        Command::Packetize { input, mtu } => packetize(&input, mtu),
        Command::Loopback {
            input,
            mtu,
            loss,
            seed,
        } => loopback(&input, mtu, loss, seed),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn open(path: &Path) -> Result<IvfReader<BufReader<File>>> {
    let reader = IvfReader::new(BufReader::new(File::open(path)?))?;
    let header = reader.header();
    println!(
        "{}: {} {} @ {}/{} s, {} frames",
        path.display(),
        String::from_utf8_lossy(&header.fourcc),
        header.size,
        header.timebase_num,
        header.timebase_den,
        header.frame_count
    );
    Ok(reader)
}

fn probe(path: &Path) -> Result<()> {
    let reader = open(path)?;
    for (index, frame) in reader.enumerate() {
        let frame = frame?;
        if !is_keyframe(&frame.data) {
            println!("{index:6} pts={:<8} {:7} bytes  inter", frame.pts, frame.data.len());
            continue;
        }
        match parse_keyframe_header(&frame.data) {
            Ok(hdr) => println!(
                "{index:6} pts={:<8} {:7} bytes  key {}x{} scale {:?}/{:?}",
                frame.pts,
                frame.data.len(),
                hdr.width,
                hdr.height,
                hdr.horizontal_scale,
                hdr.vertical_scale
            ),
            Err(e) => println!(
                "{index:6} pts={:<8} {:7} bytes  key ({e})",
                frame.pts,
                frame.data.len()
            ),
        }
    }
    Ok(())
}

fn packetize(path: &Path, mtu: usize) -> Result<()> {
    let reader = open(path)?;
    let header = reader.header().clone();
    let fragmenter = Fragmenter::new(mtu)?;

    let (mut frames, mut packets, mut bytes, mut max_fragments) = (0u64, 0u64, 0u64, 0usize);
    for frame in reader {
        let frame = frame?;
        let info = PartitionInfo {
            is_keyframe: is_keyframe(&frame.data),
            partition_id: 0,
            timestamp: rtp_timestamp(header.pts_to_ms(frame.pts)),
            last_partition: true,
        };
        let fragments = fragmenter.fragment(frame.data, &info);
        frames += 1;
        packets += fragments.len() as u64;
        bytes += fragments.iter().map(|p| p.wire_len() as u64).sum::<u64>();
        max_fragments = max_fragments.max(fragments.len());
    }

    println!(
        "mtu {mtu}: {frames} frames -> {packets} packets, {bytes} payload bytes, \
         max {max_fragments} per frame"
    );
    Ok(())
}

fn loopback(path: &Path, mtu: usize, loss: f64, seed: u64) -> Result<()> {
    if !(0.0..=1.0).contains(&loss) {
        return Err(Vp8Error::InvalidConfig("loss must be between 0.0 and 1.0"));
    }
    let reader = open(path)?;
    let header = reader.header().clone();
    let fragmenter = Fragmenter::new(mtu)?;
    let mut rtp = RtpHeader::with_random_ssrc(DEFAULT_PAYLOAD_TYPE);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reassembler = Reassembler::new();

    // Frames in send order; entries ahead of a delivered frame were lost.
    let mut sent: VecDeque<(u32, Bytes)> = VecDeque::new();
    let (mut datagrams, mut dropped, mut intact, mut corrupt) = (0u64, 0u64, 0u64, 0u64);

    for frame in reader {
        let frame = frame?;
        let timestamp = rtp_timestamp(header.pts_to_ms(frame.pts));
        let info = PartitionInfo {
            is_keyframe: is_keyframe(&frame.data),
            partition_id: 0,
            timestamp,
            last_partition: true,
        };
        sent.push_back((timestamp, frame.data.clone()));

        for packet in fragmenter.fragment(frame.data, &info) {
            let datagram = rtp.packetize(&packet);
            datagrams += 1;
            if rng.random_bool(loss) {
                dropped += 1;
                continue;
            }
            let (_, received) = parse_rtp(datagram)?;
            if let Some(out) = reassembler.push(received) {
                if match_delivered(&mut sent, out.timestamp, &out.data) {
                    intact += 1;
                } else {
                    tracing::warn!(
                        ts = out.timestamp,
                        "delivered frame differs from sent frame"
                    );
                    corrupt += 1;
                }
            }
        }
    }

    let stats = reassembler.stats();
    println!(
        "{datagrams} datagrams, {dropped} dropped; {intact} frames intact, {corrupt} corrupt, \
         {} discarded incomplete, {} stray fragments",
        stats.frames_discarded, stats.packets_discarded
    );
    Ok(())
}

/// Retire the sent frames up to the one delivered as `data` at `timestamp`.
///
/// Frames sharing a timestamp are told apart by content. Returns whether an
/// identical sent frame was found.
fn match_delivered(sent: &mut VecDeque<(u32, Bytes)>, timestamp: u32, data: &Bytes) -> bool {
    let exact = sent.iter().position(|(ts, d)| *ts == timestamp && d == data);
    let at = exact.or_else(|| sent.iter().position(|(ts, _)| *ts == timestamp));
    if let Some(at) = at {
        sent.drain(..=at);
    }
    exact.is_some()
}
