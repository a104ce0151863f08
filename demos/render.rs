//! Render Example
//!
//! Rolls a random sound, fires it twice from a delayed trigger and writes the
//! result to a 16-bit WAV file. The preset is logged as JSON so a good roll
//! can be kept.
//!
//! Run with: cargo run --example render -- [blip|coin|hit] [seed] [out.wav]

use blipfx::prelude::*;
use log::info;
use std::error::Error;

const SAMPLE_RATE: f64 = 44100.0;
const SECONDS: f64 = 1.5;

fn build_voice(params: &SoundParams) -> Box<dyn GraphModule> {
    match params {
        SoundParams::Blip(p) => {
            let mut blip = Blip::new(SAMPLE_RATE);
            blip.apply_params(p);
            Box::new(blip)
        }
        SoundParams::Coin(p) => {
            let mut coin = Coin::new(SAMPLE_RATE);
            coin.apply_params(p);
            Box::new(coin)
        }
        SoundParams::Hit(p) => {
            let mut hit = Hit::new(SAMPLE_RATE);
            hit.apply_params(p);
            Box::new(hit)
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let kind = SoundKind::from_name(&args.next().unwrap_or_else(|| "coin".to_string()))?;
    let seed: u64 = match args.next() {
        Some(s) => s.parse()?,
        None => 1,
    };
    let path = args.next().unwrap_or_else(|| format!("{}.wav", kind.name()));

    let mut rng = Rng::new(seed, seed.rotate_left(32) ^ 0x9e37_79b9_7f4a_7c15);
    let params = kind.random(&mut rng, SAMPLE_RATE);
    info!("preset:\n{}", params.to_json()?);

    let mut rack = Rack::new(SAMPLE_RATE);
    let clock = rack.add("clock", DTrig::new(SAMPLE_RATE));
    let voice = rack.add_boxed(kind.name(), build_voice(&params));
    rack.set_param(clock.id(), DTrig::DELAY, 0.6);
    rack.connect(clock.out("trig"), voice.in_("trig"))?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;

    let frames = (SAMPLE_RATE * SECONDS) as usize;
    for _ in 0..frames {
        rack.tick();
        // outputs swing +/-5 V
        let sample = rack.output(voice.out("out")).unwrap_or(0.0) / 5.0;
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f64) as i16)?;
    }
    writer.finalize()?;

    info!("wrote {} samples to {}", frames, path);
    Ok(())
}
