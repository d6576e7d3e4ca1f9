use std::{process::ExitCode, rc::Rc};

use anyhow::Result;
use rusty_renderer::{
    config::WINDOW_TITLE,
    layers::{FrameUpdate, Layer, LayerStack},
    logging,
    timer::FrameTimer,
    window::create_window,
    FrameOutcome, Renderer, RendererConfig,
};
use tracing::info;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::Window,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    logging::init()?;

    let event_loop = EventLoop::new()?;
    let window = Rc::new(create_window(&event_loop)?);
    let mut renderer = Renderer::new(&window, RendererConfig::default())?;

    let mut layers = LayerStack::new();
    layers.push_overlay(Box::new(FpsTitle {
        window: Rc::clone(&window),
    }));
    let mut timer = FrameTimer::new();
    let mut failure = None;

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(|event, elwt| match event {
        Event::WindowEvent { event, .. } => {
            if layers.dispatch_event(&event) {
                return;
            }
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                    renderer.notify_resized()
                }
                _ => {}
            }
        }
        Event::AboutToWait => match renderer.draw_frame() {
            Ok(outcome) => {
                let suspended = outcome == FrameOutcome::Suspended;
                // nothing to draw until the window gets its area back
                elwt.set_control_flow(if suspended {
                    ControlFlow::Wait
                } else {
                    ControlFlow::Poll
                });
                let stats = if suspended { None } else { timer.tick() };
                layers.update(&FrameUpdate { outcome, stats });
            }
            Err(err) => {
                failure = Some(err);
                elwt.exit();
            }
        },
        Event::LoopExiting => info!("Shutting down"),
        _ => {}
    })?;

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Shows the frame rate in the window title.
struct FpsTitle {
    window: Rc<Window>,
}

impl Layer for FpsTitle {
    fn name(&self) -> &str {
        "fps title"
    }

    fn on_update(&mut self, update: &FrameUpdate) {
        if let Some(stats) = update.stats {
            self.window
                .set_title(&format!("{} | {}", WINDOW_TITLE, stats));
        }
    }
}
