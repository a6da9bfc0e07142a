use anyhow::Context;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use condraw_engine::backend::{Extent, ShaderSource, WgpuBackend};
use condraw_engine::core::{App, AppControl, FrameCtx};
use condraw_engine::device::Gpu;
use condraw_engine::frame::{FrameOrchestrator, SceneConfig, SceneSetup};
use condraw_engine::pipeline::ShaderSet;
use condraw_engine::update::UpdateLoop;

use crate::cube;

const SHADERS: ShaderSet<'static> = ShaderSet {
    graphics: ShaderSource {
        label: "cube",
        wgsl: include_str!("../shaders/cube.wgsl"),
    },
    vertex_entry: "vs_main",
    fragment_entry: "fs_main",
    compute: ShaderSource {
        label: "cube compute",
        wgsl: include_str!("../shaders/cube_compute.wgsl"),
    },
    compute_entry: "cs_main",
};

struct Running {
    backend: WgpuBackend,
    scene: FrameOrchestrator,
    update: UpdateLoop,
}

/// Drives the predicated cube scene from the window runtime.
pub struct SceneApp {
    config: SceneConfig,
    running: Option<Running>,
    /// Branch shown in the title; `None` until the first frame.
    shown: Option<bool>,
}

impl SceneApp {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            running: None,
            shown: None,
        }
    }
}

impl App for SceneApp {
    fn on_init(&mut self, gpu: &Gpu<'_>) -> anyhow::Result<()> {
        let mut backend = gpu.create_backend();
        let mesh = cube::mesh();

        let scene = FrameOrchestrator::new(
            &mut backend,
            SceneSetup {
                frame_count: gpu.frame_count(),
                extent: gpu.extent(),
                color_format: gpu.surface_format(),
                shaders: SHADERS,
                mesh: &mesh,
                config: self.config.clone(),
            },
        )
        .context("failed to build the scene")?;

        self.running = Some(Running {
            backend,
            update: UpdateLoop::new(scene.config()),
            scene,
        });
        Ok(())
    }

    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_resized(&mut self, _gpu: &Gpu<'_>, size: PhysicalSize<u32>) -> AppControl {
        let Some(run) = &mut self.running else {
            return AppControl::Continue;
        };

        match run
            .scene
            .resize(&mut run.backend, Extent::new(size.width, size.height))
        {
            Ok(()) => AppControl::Continue,
            Err(e) => {
                log::error!("resize failed: {e:#}");
                AppControl::Exit
            }
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(run) = &mut self.running else {
            return AppControl::Continue;
        };

        let dt = ctx.time.dt;
        let mut active = None;
        let control = ctx.present_with(|view| {
            let tick = run.update.step(&mut run.scene, &mut run.backend, view, dt)?;
            active = Some(tick.active);
            Ok(())
        });

        if active.is_some() && active != self.shown {
            self.shown = active;
            let active = active == Some(true);
            let branch = if active { "primary" } else { "alternate" };
            ctx.runtime.set_title(format!("condraw - {branch} branch"));
        }

        control
    }

    fn on_exit(&mut self) {
        if let Some(mut run) = self.running.take() {
            if let Err(e) = run.scene.idle(&mut run.backend) {
                log::warn!("device did not go idle on exit: {e:#}");
            }
        }
    }
}
