use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use log::info;
use std::{
    io::{self, Write},
    process::ExitCode,
};
use swapchain_bootstrap::{AppConfig, Application, ValidationLayers};
use winit::{
    dpi::PhysicalSize,
    event::{Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::WindowBuilder,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Validation {
    Require,
    Request,
    Disable,
}

impl From<Validation> for ValidationLayers {
    fn from(validation: Validation) -> Self {
        match validation {
            Validation::Require => ValidationLayers::Require,
            Validation::Request => ValidationLayers::Request,
            Validation::Disable => ValidationLayers::Disable,
        }
    }
}

/// Opens a window and sets up Vulkan up to the swapchain.
#[derive(Parser, Debug)]
#[command(name = "swapchain-bootstrap", version, about)]
struct Args {
    /// Window width in pixels
    #[arg(long, default_value_t = 1200)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 1000)]
    height: u32,

    /// Window title, also advertised as the application name
    #[arg(long, default_value = "vulkan")]
    title: String,

    /// Forward driver warnings and errors to the log
    #[arg(long, default_value_t = cfg!(debug_assertions), action = ArgAction::Set)]
    diagnostics: bool,

    /// Validation layer policy when diagnostics are enabled
    #[arg(long, value_enum, default_value_t = Validation::Request)]
    validation: Validation,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    exit_code(run(args), &mut io::stderr())
}

/// Writes a failure to `diagnostics` regardless of the log filter.
fn exit_code(result: Result<()>, diagnostics: &mut impl Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(diagnostics, "error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(&args.title)
        .with_inner_size(PhysicalSize::new(args.width, args.height))
        .build(&event_loop)
        .context("failed to create window")?;

    let config = AppConfig {
        app_name: args.title.clone(),
        enable_diagnostics: args.diagnostics,
        validation: args.validation.into(),
        ..AppConfig::default()
    };
    let app = Application::new(&config, &window).context("vulkan setup failed")?;
    info!(
        "ready: {} swapchain images on {}",
        app.swapchain().images().len(),
        app.device_metadata().device_name()
    );

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::WindowEvent {
                event:
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                virtual_keycode: Some(VirtualKeyCode::Escape),
                                ..
                            },
                        ..
                    },
                ..
            } => *control_flow = ControlFlow::Exit,
            _ => (),
        }
    });

    info!("shutting down");
    drop(app);
    drop(window);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_reach_the_diagnostic_stream() {
        let mut diagnostics = Vec::new();
        let err = anyhow::anyhow!("no physical device met the requirements")
            .context("vulkan setup failed");
        let code = exit_code(Err(err), &mut diagnostics);
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));
        assert_eq!(
            String::from_utf8(diagnostics).unwrap(),
            "error: vulkan setup failed: no physical device met the requirements\n"
        );

        let mut diagnostics = Vec::new();
        let code = exit_code(Ok(()), &mut diagnostics);
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["swapchain-bootstrap"]);
        assert_eq!((args.width, args.height), (1200, 1000));
        assert_eq!(args.title, "vulkan");
        assert_eq!(args.validation, Validation::Request);
        assert_eq!(args.diagnostics, cfg!(debug_assertions));
    }
}
