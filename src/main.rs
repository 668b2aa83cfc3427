#[macro_use]
extern crate clap;

use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use audscope::fifo::Fifo;
use audscope::window;
use audscope::{FrameScheduler, Mode, Param, Pixmap, Setup};
use portaudio::stream::{InputCallbackArgs, InputSettings, Parameters};
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::{Keycode, Mod};
use sdl2::pixels::PixelFormatEnum;

fn arg<T: FromStr>(matches: &clap::ArgMatches, name: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = matches.value_of(name).ok_or_else(|| anyhow!("missing --{}", name))?;
    raw.parse().map_err(|e| anyhow!("--{} {:?}: {}", name, raw, e))
}

/// Parameter driven by one wheel axis under the held modifiers.
fn wheel_param(mode: Mode, mods: Mod, vertical: bool) -> Option<Param> {
    let shift = mods.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD);
    let alt = mods.intersects(Mod::LALTMOD | Mod::RALTMOD);
    let ctrl = mods.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD);
    let spectrum = mode == Mode::Spectrum;
    Some(match (shift, alt, ctrl, vertical) {
        (true, _, _, true) if spectrum => Param::Offset,
        (true, _, _, true) => Param::Scale,
        (true, _, _, false) if spectrum => Param::Saturation,
        (true, _, _, false) => Param::Bleed,
        (_, true, _, true) if spectrum => Param::ScanLines,
        (_, true, _, true) => Param::Red,
        (_, true, _, false) if spectrum => Param::Bandwidth,
        (_, true, _, false) => Param::Blue,
        (_, _, true, true) => Param::Green,
        (false, false, false, true) => Param::Trigger,
        _ => return None,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let parser_yaml = load_yaml!("args.yml");
    let parser = clap::App::from_yaml(parser_yaml);
    let matches = parser.get_matches();

    let windows = window::windows();
    let pa = portaudio::PortAudio::new().context("initializing PortAudio")?;

    if matches.is_present("list-win") {
        for name in windows.keys() {
            println!("{}", name);
        }
        return Ok(());
    }
    if matches.is_present("list-dev") {
        for dev in pa.devices().context("listing devices")? {
            match dev {
                Ok((idx, info)) => {
                    if info.max_input_channels == 0 { continue; }
                    println!("{:?}: {} (default {} Hz)", idx, info.name, info.default_sample_rate);
                }
                Err(err) => eprintln!("(error enumerating device: {})", err),
            }
        }
        return Ok(());
    }

    let mode: Mode = arg(&matches, "mode")?;
    let init_width: u32 = arg(&matches, "sco-width")?;
    let init_height: u32 = arg(&matches, "sco-height")?;
    let frame: usize = arg(&matches, "frame-size")?;
    let fpb: u32 = arg(&matches, "aud-period")?;
    let gfx_rate: f64 = arg(&matches, "gfx-rate")?;
    let win_name = matches.value_of("fft-win").unwrap_or("rect");
    let win = *windows
        .get(win_name)
        .ok_or_else(|| anyhow!("no window function {:?} (see --list-win)", win_name))?;

    let didx = if let Some(devname) = matches.value_of("aud-dev") {
        let (didx, _) = pa
            .devices()
            .context("listing devices")?
            .filter_map(Result::ok)
            .find(|(_, info)| info.name == devname)
            .ok_or_else(|| anyhow!("no input device named {:?}", devname))?;
        didx
    } else {
        pa.default_input_device().context("getting default input device")?
    };
    let info = pa.device_info(didx).context("getting device info")?;
    let rate: f64 = if matches.is_present("aud-rate") {
        arg(&matches, "aud-rate")?
    } else {
        info.default_sample_rate
    };

    let setup = Setup {
        mode,
        frame,
        rate,
        pixel_scale: arg(&matches, "pixel-scale")?,
        threads: arg(&matches, "threads")?,
        window: win,
    };
    let scheduler = Arc::new(FrameScheduler::new(setup, init_width as usize, init_height as usize)?);
    log::info!("capturing from {} at {} Hz, {} frames per period", info.name, rate, fpb);

    let params = Parameters::<i16>::new(didx, 1, true, info.default_low_input_latency);
    let settings = InputSettings::new(params, rate, fpb);
    let mut stream = pa
        .open_non_blocking_stream(settings, {
            let scheduler = scheduler.clone();
            let mut fifo: Fifo<i16> = Fifo::new(frame);
            move |InputCallbackArgs { buffer, flags, .. }| {
                if !flags.is_empty() {
                    log::error!("capture stream: {:?}", flags);
                }
                fifo.push(buffer);
                scheduler.on_batch(fifo.recent());
                portaudio::Continue
            }
        })
        .context("opening stream")?;

    let sdl = sdl2::init().map_err(anyhow::Error::msg).context("initializing SDL")?;
    let sdl_video = sdl.video().map_err(anyhow::Error::msg).context("initializing SDL video")?;
    let scope_win = sdl_video
        .window("audscope", init_width, init_height)
        .position_centered()
        .resizable()
        .build()
        .context("creating scope window")?;
    let mut canvas = scope_win.into_canvas().build().context("creating scope canvas")?;
    let creator = canvas.texture_creator();
    let mut grid = scheduler.grid();
    let mut texture = creator
        .create_texture_streaming(PixelFormatEnum::RGB24, grid.0 as u32, grid.1 as u32)
        .context("creating scope texture")?;
    canvas.window_mut().set_title(&scheduler.status())?;

    let mut eloop = sdl.event_pump().map_err(anyhow::Error::msg).context("creating event loop")?;
    let period = Duration::new(1, 0).div_f64(gfx_rate.max(1.0));
    let profile = matches.is_present("profile");
    let mut last_print = Instant::now();
    let mut pixmap = Pixmap::default();
    stream.start().context("starting stream")?;

    'main: loop {
        let deadline = Instant::now() + period;
        if profile {
            hprof::start_frame();
        }

        for event in eloop.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => break 'main,
                Event::Window { win_event: WindowEvent::SizeChanged(w, h), .. } => {
                    if w > 0 && h > 0 {
                        scheduler.resize(w as usize, h as usize)?;
                        grid = scheduler.grid();
                        texture = creator
                            .create_texture_streaming(PixelFormatEnum::RGB24, grid.0 as u32, grid.1 as u32)
                            .context("recreating scope texture")?;
                    }
                }
                Event::MouseWheel { x, y, .. } => {
                    let mods = sdl.keyboard().mod_state();
                    let mut status = None;
                    for (steps, vertical) in [(y, true), (x, false)] {
                        if steps == 0 { continue; }
                        if let Some(param) = wheel_param(mode, mods, vertical) {
                            status = Some(scheduler.adjust(param, steps));
                        }
                    }
                    if let Some(status) = status {
                        canvas.window_mut().set_title(&status)?;
                    }
                }
                _ => (),
            }
        }

        // a stale tick keeps the previous pixmap
        scheduler.on_tick(&mut pixmap);
        if (pixmap.width, pixmap.height) == grid && !pixmap.data.is_empty() {
            texture
                .update(None, &pixmap.data, pixmap.pitch())
                .context("uploading frame")?;
        }
        canvas.copy(&texture, None, None).map_err(anyhow::Error::msg)?;
        canvas.present();

        if profile {
            hprof::end_frame();
            if last_print.elapsed() >= Duration::from_secs(1) {
                hprof::profiler().print_timing();
                log::info!("{:?}", scheduler.stats());
                last_print = Instant::now();
            }
        }

        let wait = deadline.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }

    stream.stop().context("stopping stream")?;
    Ok(())
}
