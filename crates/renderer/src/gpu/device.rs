use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::{anyhow, Result};
use fractal::{Palette, Rgb, SurfaceSize, UniformValue};
use wgpu::naga::ShaderStage;

use super::context::{GpuContext, GpuPowerPreference};
use super::pipeline::{self, ProgramPipeline};
use super::uniforms::{self, PaletteBuffer};
use crate::device::{
    DeviceError, ProgramId, ShaderDevice, ShaderId, StageKind, UniformLocation,
};
use crate::glsl::{self, ProgramLayout, StageInterface};

struct GpuShader {
    kind: StageKind,
    interface: Option<StageInterface>,
    module: Option<wgpu::ShaderModule>,
}

#[derive(Default)]
struct GpuProgram {
    layout: Option<ProgramLayout>,
    pipeline: Option<ProgramPipeline>,
}

/// [`ShaderDevice`] backed by wgpu, rendering into an offscreen RGBA8 target.
///
/// GLSL is checked by the shared naga front end first so compile and link
/// failures carry readable logs, then handed to wgpu to build the module.
pub struct WgpuDevice {
    context: GpuContext,
    layout: wgpu::BindGroupLayout,
    palette: PaletteBuffer,
    shaders: HashMap<ShaderId, GpuShader>,
    programs: HashMap<ProgramId, GpuProgram>,
    bound: Option<ProgramId>,
    next_id: u32,
}

impl WgpuDevice {
    pub fn new(size: SurfaceSize, power: GpuPowerPreference) -> Result<Self> {
        let context = GpuContext::new(size, power)?;
        tracing::info!(adapter = %context.adapter_name, "GPU device ready");
        let layout = pipeline::bind_layout(&context.device);
        let palette = PaletteBuffer::new(
            &context.device,
            &glsl::encode_palette(Palette::default().colors()),
        );
        Ok(Self {
            context,
            layout,
            palette,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            bound: None,
            next_id: 0,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_name
    }

    pub fn size(&self) -> SurfaceSize {
        self.context.target.size
    }

    /// Copies the offscreen target back as tightly packed RGBA8 rows.
    pub fn read_frame(&self) -> Result<Vec<u8>> {
        let device = &self.context.device;
        let target = &self.context.target;
        let SurfaceSize { width, height } = target.size;

        let row_bytes = width * 4;
        let bytes_per_row = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame readback"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame copy encoder"),
        });
        encoder.copy_texture_to_buffer(
            target.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(Some(encoder.finish()));

        let data = uniforms::map_read(device, &readback)?;
        let mut pixels = vec![0u8; (row_bytes * height) as usize];
        for (row, chunk) in pixels.chunks_mut(row_bytes as usize).enumerate() {
            let start = row * bytes_per_row as usize;
            chunk.copy_from_slice(&data[start..start + row_bytes as usize]);
        }
        Ok(pixels)
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn create_module(&self, kind: StageKind, source: &str) -> Result<wgpu::ShaderModule> {
        let stage = match kind {
            StageKind::Vertex => ShaderStage::Vertex,
            StageKind::Fragment => ShaderStage::Fragment,
        };
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kind.label()),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(source.to_owned()),
                stage,
                defines: &[],
            },
        });
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(anyhow!("{err}")),
            None => Ok(module),
        }
    }

    fn linked(&self, program: ProgramId) -> Result<&GpuProgram, DeviceError> {
        let object = self
            .programs
            .get(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        if object.pipeline.is_none() {
            return Err(DeviceError::NotLinked(program));
        }
        Ok(object)
    }
}

fn compiled_module(
    shaders: &HashMap<ShaderId, GpuShader>,
    id: ShaderId,
    kind: StageKind,
) -> Result<(&StageInterface, &wgpu::ShaderModule), String> {
    let object = shaders
        .get(&id)
        .ok_or_else(|| format!("invalid shader object {}", id.0))?;
    if object.kind != kind {
        return Err(format!("shader {} is not a {kind} shader", id.0));
    }
    match (object.interface.as_ref(), object.module.as_ref()) {
        (Some(interface), Some(module)) => Ok((interface, module)),
        _ => Err(format!("{kind} shader {} has not been compiled", id.0)),
    }
}

impl ShaderDevice for WgpuDevice {
    fn create_shader(&mut self, kind: StageKind) -> ShaderId {
        let id = ShaderId(self.next());
        self.shaders.insert(
            id,
            GpuShader {
                kind,
                interface: None,
                module: None,
            },
        );
        id
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        let kind = self
            .shaders
            .get(&shader)
            .map(|object| object.kind)
            .ok_or_else(|| format!("invalid shader object {}", shader.0))?;
        let interface = glsl::compile_stage(kind, source)?;
        let module = self
            .create_module(kind, source)
            .map_err(|err| err.to_string())?;
        if let Some(object) = self.shaders.get_mut(&shader) {
            object.interface = Some(interface);
            object.module = Some(module);
        }
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next());
        self.programs.insert(id, GpuProgram::default());
        id
    }

    fn link_program(
        &mut self,
        program: ProgramId,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<(), String> {
        let (vertex_interface, vertex_module) =
            compiled_module(&self.shaders, vertex, StageKind::Vertex)?;
        let (fragment_interface, fragment_module) =
            compiled_module(&self.shaders, fragment, StageKind::Fragment)?;
        let layout = glsl::link_stages(vertex_interface, fragment_interface)?;

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = ProgramPipeline::new(
            device,
            &self.layout,
            vertex_module,
            fragment_module,
            layout.buffer_size(),
            &self.palette,
        );
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err.to_string());
        }

        let object = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("invalid program object {}", program.0))?;
        object.layout = Some(layout);
        object.pipeline = Some(built);
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bound == Some(program) {
            self.bound = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.bound = program;
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.bound
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)?
            .layout
            .as_ref()?
            .location(name)
    }

    fn write_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), DeviceError> {
        let object = self.linked(program)?;
        let bytes = glsl::encode(value, location.kind)?;
        let Some(pipeline) = object.pipeline.as_ref() else {
            return Err(DeviceError::NotLinked(program));
        };
        let size = pipeline.uniforms.size();
        if u64::from(location.offset) + bytes.len() as u64 > size {
            return Err(DeviceError::OutOfBounds {
                offset: location.offset,
                size: size as u32,
            });
        }
        pipeline
            .uniforms
            .write(&self.context.queue, u64::from(location.offset), &bytes);
        Ok(())
    }

    fn read_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
    ) -> Result<UniformValue, DeviceError> {
        let object = self.linked(program)?;
        let Some(pipeline) = object.pipeline.as_ref() else {
            return Err(DeviceError::NotLinked(program));
        };
        let len = u64::from(glsl::storage_size(location.kind));
        let size = pipeline.uniforms.size();
        // Copies must start on a 4-byte boundary, which every std140 member does.
        if u64::from(location.offset) + len > size {
            return Err(DeviceError::OutOfBounds {
                offset: location.offset,
                size: size as u32,
            });
        }
        let bytes = pipeline
            .uniforms
            .read(
                &self.context.device,
                &self.context.queue,
                u64::from(location.offset),
                len,
            )
            .map_err(|err| DeviceError::Gpu(err.to_string()))?;
        glsl::decode(&bytes, location.kind).ok_or(DeviceError::OutOfBounds {
            offset: location.offset,
            size: size as u32,
        })
    }

    fn upload_palette(&mut self, colors: &[Rgb]) -> Result<(), DeviceError> {
        let bytes = glsl::encode_palette(colors);
        let limit = u64::from(self.context.device.limits().max_storage_buffer_binding_size);
        if bytes.len() as u64 > limit {
            return Err(DeviceError::PaletteTooLarge {
                entries: colors.len(),
                bytes: bytes.len() as u64,
            });
        }

        if self.palette.fits(bytes.len()) {
            self.palette.write(&self.context.queue, &bytes);
        } else {
            self.palette = PaletteBuffer::new(&self.context.device, &bytes);
            for object in self.programs.values_mut() {
                if let Some(pipeline) = object.pipeline.as_mut() {
                    pipeline.rebind(&self.context.device, &self.layout, &self.palette);
                }
            }
        }
        tracing::debug!(entries = colors.len(), "uploaded palette");
        Ok(())
    }

    fn draw(&mut self) -> Result<(), DeviceError> {
        let program = self
            .bound
            .ok_or_else(|| DeviceError::Gpu("draw issued with no program bound".into()))?;
        let object = self.linked(program)?;
        let Some(pipeline) = object.pipeline.as_ref() else {
            return Err(DeviceError::NotLinked(program));
        };

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("fractal encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fractal pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.context.target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&pipeline.pipeline);
            render_pass.set_bind_group(0, &pipeline.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.context.resize(size);
    }
}
