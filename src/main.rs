use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use m4amux::audio::aac::AacEncoder;
use m4amux::audio::recorder::encode_pcm;
use m4amux::audio::FrameEncoder;
use m4amux::config::{self, MuxConfig};
use m4amux::{Mp4Muxer, MuxError, Result};

const USAGE: &str = "usage: m4amux <config.json> <input.s16le> <output.m4a>";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [config_path, input, output] = args.as_slice() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    if let Err(e) = run(Path::new(config_path), Path::new(input), Path::new(output)) {
        log::error!("m4amux failed: {e}");
        std::process::exit(1);
    }
}

fn run(config_path: &Path, input: &Path, output: &Path) -> Result<()> {
    let config = MuxConfig::from_json_file(config_path)?;
    let params = config.stream_params()?;

    let mut encoder = AacEncoder::new(params.sample_rate, params.channels, config.bitrate())?;

    let pcm = File::open(input)
        .map_err(|e| MuxError::Config(format!("Failed to open {}: {e}", input.display())))?;

    let mut muxer = Mp4Muxer::create(output, params)?;
    muxer.write_header()?;
    encode_pcm(BufReader::new(pcm), &mut encoder, &mut muxer)?;
    muxer.set_decoder_config(encoder.decoder_config())?;
    muxer.set_tags(config.tags.clone())?;
    muxer.write_trailer()?;
    let (_, summary) = muxer.close()?;

    config::write_summary(output.with_extension("json"), &summary)?;
    Ok(())
}
