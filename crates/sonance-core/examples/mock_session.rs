//! Mock session demo: build a system, route a voice through a bus, and read
//! the master spectrum back, all against the in-process engine.
//!
//! Run with: RUST_LOG=sonance_core=debug cargo run -p sonance-core --example mock_session

use std::sync::Arc;

use sonance_core::mock::MockEngine;
use sonance_core::{ChannelControl, DspType, EngineConfig, FftWindow, Mode, System};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), sonance_core::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let engine = Arc::new(MockEngine::new());
    let config = EngineConfig::new(64).with_sample_rate(48_000);
    let system = System::builder(engine.clone()).config(config).build()?;
    println!("Engine version: {}", system.version()?);

    // --- Routing ---
    let music = system.create_channel_group("music")?;
    let theme = system.create_sound("theme.ogg", Mode::LOOP_NORMAL)?;
    let channel = system.play_sound(&theme, Some(&music), false)?;
    channel.set_volume(0.8)?;

    let echo = system.create_dsp_by_type(DspType::Echo)?;
    music.add_dsp(0, &echo)?;
    println!("Units on 'music': {}", music.num_dsps()?);

    // --- Fades ---
    let now = music.dsp_clock()?.clock;
    music.set_fade_point_ramp(now + 48_000, 0.0)?;
    for point in music.fade_points()? {
        println!("  fade point at {:>8}: {:.2}", point.clock, point.volume);
    }

    // --- Analysis ---
    let master = system.master_channel_group()?;
    let fft = system.create_fft()?;
    fft.set_window_size(1024)?;
    fft.set_window(FftWindow::Hanning)?;
    master.add_dsp(0, &fft)?;

    engine.set_spectrum(fft.raw(), &[&[0.0, 0.5, 1.0, 0.25], &[0.0, 0.25, 0.5, 0.0]]);
    system.update()?;
    let frame = fft.spectrum()?;
    println!(
        "Spectrum: {} channels x {} bins, rms {:.3}, centroid {:.0} Hz",
        frame.num_channels(),
        frame.length(),
        fft.rms()?,
        fft.spectral_centroid()?
    );

    let playing = system.channels_playing()?;
    println!(
        "Playing: {} ({} real)",
        playing.channels, playing.real_channels
    );

    // --- Teardown ---
    master.remove_dsp(&fft)?;
    music.remove_dsp(&echo)?;
    fft.into_dsp().close()?;
    echo.close()?;
    music.stop()?;
    theme.close()?;
    music.close()?;
    system.close()?;
    println!("Live objects after close: {}", engine.live_objects());
    Ok(())
}
