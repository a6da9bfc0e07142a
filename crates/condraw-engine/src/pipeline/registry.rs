use crate::backend::{
    Backend, BackendError, BindingKind, BindingLayoutDesc, ComputePipelineDesc,
    GraphicsPipelineDesc, LayoutEntry, LayoutId, PipelineId, ShaderSource,
};
use crate::model::Vertex;

use super::{CAMERA_BINDING, DISPATCH_BINDING, MODEL_BINDING, STORAGE_BINDING};

/// Shader sources and entry points for both pipelines.
#[derive(Debug, Copy, Clone)]
pub struct ShaderSet<'a> {
    pub graphics: ShaderSource<'a>,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub compute: ShaderSource<'a>,
    pub compute_entry: &'a str,
}

/// Binding layouts; immutable once created.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PipelineLayoutSet {
    /// Camera (0) and model (1) blocks for the vertex stage, dispatch value view (2)
    /// for the fragment stage.
    pub graphics: LayoutId,
    /// Dispatch value as read-write storage (0).
    pub compute: LayoutId,
}

impl PipelineLayoutSet {
    const GRAPHICS_ENTRIES: [LayoutEntry; 3] = [
        LayoutEntry {
            binding: CAMERA_BINDING,
            kind: BindingKind::UniformBuffer,
            stages: wgpu::ShaderStages::VERTEX,
        },
        LayoutEntry {
            binding: MODEL_BINDING,
            kind: BindingKind::UniformBuffer,
            stages: wgpu::ShaderStages::VERTEX,
        },
        LayoutEntry {
            binding: DISPATCH_BINDING,
            kind: BindingKind::TexelBuffer,
            stages: wgpu::ShaderStages::FRAGMENT,
        },
    ];

    const COMPUTE_ENTRIES: [LayoutEntry; 1] = [LayoutEntry {
        binding: STORAGE_BINDING,
        kind: BindingKind::StorageBuffer,
        stages: wgpu::ShaderStages::COMPUTE,
    }];

    fn create<B: Backend>(backend: &mut B) -> Result<Self, BackendError> {
        let graphics = backend.create_binding_layout(&BindingLayoutDesc {
            label: "condraw graphics layout",
            entries: &Self::GRAPHICS_ENTRIES,
        })?;
        let compute = backend.create_binding_layout(&BindingLayoutDesc {
            label: "condraw compute layout",
            entries: &Self::COMPUTE_ENTRIES,
        })?;
        Ok(Self { graphics, compute })
    }
}

/// Owns the scene's two pipelines. Shared read-only by every frame slot.
#[derive(Debug)]
pub struct PipelineRegistry {
    layouts: PipelineLayoutSet,
    graphics: PipelineId,
    compute: PipelineId,
}

impl PipelineRegistry {
    /// Builds both pipelines.
    ///
    /// Fails with [`BackendError::MissingCapability`] before creating anything if
    /// the device cannot gate commands on a device-read value or lacks compute.
    pub fn new<B: Backend>(
        backend: &mut B,
        shaders: &ShaderSet<'_>,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, BackendError> {
        let caps = backend.capabilities();
        if !caps.conditional_execution {
            return Err(BackendError::MissingCapability("conditional execution"));
        }
        if !caps.compute {
            return Err(BackendError::MissingCapability("compute"));
        }

        let layouts = PipelineLayoutSet::create(backend)?;

        let graphics = backend.create_graphics_pipeline(&GraphicsPipelineDesc {
            label: "condraw graphics pipeline",
            shader: shaders.graphics,
            vertex_entry: shaders.vertex_entry,
            fragment_entry: shaders.fragment_entry,
            layout: layouts.graphics,
            vertex_layout: Vertex::layout(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            color_format,
        })?;

        let compute = backend.create_compute_pipeline(&ComputePipelineDesc {
            label: "condraw compute pipeline",
            shader: shaders.compute,
            entry: shaders.compute_entry,
            layout: layouts.compute,
        })?;

        log::info!("pipelines ready (graphics {color_format:?}, compute `{}`)", shaders.compute_entry);

        Ok(Self {
            layouts,
            graphics,
            compute,
        })
    }

    #[inline]
    pub fn layouts(&self) -> PipelineLayoutSet {
        self.layouts
    }

    #[inline]
    pub fn graphics(&self) -> PipelineId {
        self.graphics
    }

    #[inline]
    pub fn compute(&self) -> PipelineId {
        self.compute
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BindingEntry, BufferDesc, BufferRegion, BufferUsage, SoftBackend, SoftConfig,
    };

    const SHADERS: ShaderSet<'static> = ShaderSet {
        graphics: ShaderSource {
            label: "graphics",
            wgsl: "",
        },
        vertex_entry: "vs_main",
        fragment_entry: "fs_main",
        compute: ShaderSource {
            label: "compute",
            wgsl: "",
        },
        compute_entry: "cs_main",
    };

    fn backend(config: SoftConfig) -> SoftBackend {
        SoftBackend::new(config).with_kernel("cs_main", |_, _| {})
    }

    #[test]
    fn builds_both_pipelines() {
        let mut b = backend(SoftConfig::default());
        let registry =
            PipelineRegistry::new(&mut b, &SHADERS, wgpu::TextureFormat::Bgra8UnormSrgb).unwrap();
        assert_ne!(registry.graphics(), registry.compute());
        assert_ne!(registry.layouts().graphics, registry.layouts().compute);
    }

    #[test]
    fn missing_conditional_execution_is_fatal() {
        let mut b = backend(SoftConfig {
            conditional_execution: false,
            ..SoftConfig::default()
        });
        let err = PipelineRegistry::new(&mut b, &SHADERS, wgpu::TextureFormat::Bgra8UnormSrgb)
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingCapability("conditional execution")));
    }

    #[test]
    fn missing_compute_is_fatal() {
        let mut b = backend(SoftConfig {
            compute: false,
            ..SoftConfig::default()
        });
        assert!(matches!(
            PipelineRegistry::new(&mut b, &SHADERS, wgpu::TextureFormat::Bgra8UnormSrgb),
            Err(BackendError::MissingCapability("compute"))
        ));
    }

    #[test]
    fn graphics_layout_needs_all_three_bindings() {
        let mut b = backend(SoftConfig::default());
        let registry =
            PipelineRegistry::new(&mut b, &SHADERS, wgpu::TextureFormat::Bgra8UnormSrgb).unwrap();
        let buffer = b
            .create_buffer(&BufferDesc {
                label: "blocks",
                size: 1024,
                usage: BufferUsage::Uniform,
            })
            .unwrap();
        let at = |offset| BufferRegion::new(buffer, offset, 64);

        let partial = [
            BindingEntry {
                binding: CAMERA_BINDING,
                region: at(0),
            },
            BindingEntry {
                binding: MODEL_BINDING,
                region: at(256),
            },
        ];
        assert!(
            b.create_binding_set("partial", registry.layouts().graphics, &partial)
                .is_err()
        );

        let full = [
            partial[0],
            partial[1],
            BindingEntry {
                binding: DISPATCH_BINDING,
                region: at(512),
            },
        ];
        assert!(
            b.create_binding_set("full", registry.layouts().graphics, &full)
                .is_ok()
        );
    }
}
