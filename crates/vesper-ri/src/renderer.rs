// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The renderer context: the single entry point for describing a scene.
//!
//! Every call is validated against the current block structure before
//! anything is emitted or stored. A call that fails leaves the renderer as it
//! was; a call that succeeds is forwarded to the [`ProtocolEmitter`] (if any)
//! before the scoped state is updated.

use crate::config::{ProceduralExpansion, RendererConfig, WorldOptionPolicy};
use crate::emitter::{ProtocolEmitter, RibWriter};
use crate::error::{RendererError, RendererResult};
use crate::motion::{MotionBlock, MotionSample};
use crate::namespace::{KeyTarget, NamespaceResolver, Resolution, ResolvedKey, SchemaEntry};
use crate::primitive::Primitive;
use crate::procedural::{DeferredProcedural, Procedural};
use crate::renderable::ShaderType;
use crate::state::{ScopeKind, ShaderBinding, StateFrame, StateStack};
use std::collections::btree_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::path::Path;
use vesper_core::math::{Aabb, Mat4};
use vesper_core::{CompoundData, Data, DataKind};

const IN_WORLD: &str = "inside a world block";
const BEFORE_WORLD: &str = "before world_begin";
const OUTSIDE_MOTION: &str = "outside a motion block";

/// A stateful scene description context.
///
/// A renderer without an emitter runs in "no context" mode: every call is
/// validated and tracked as usual but nothing is written.
pub struct Renderer {
    config: RendererConfig,
    resolver: NamespaceResolver,
    stack: StateStack,
    options: CompoundData,
    coordinate_systems: HashMap<String, Mat4>,
    camera: Option<Mat4>,
    motion: Option<MotionBlock>,
    deferred: VecDeque<DeferredProcedural>,
    emitter: Option<Box<dyn ProtocolEmitter>>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Creates a renderer in "no context" mode with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    /// Creates a renderer in "no context" mode.
    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            resolver: NamespaceResolver::new(
                config.native_prefix.clone(),
                config.user_prefix.clone(),
            ),
            config,
            stack: StateStack::new(),
            options: CompoundData::new(),
            coordinate_systems: HashMap::new(),
            camera: None,
            motion: None,
            deferred: VecDeque::new(),
            emitter: None,
        }
    }

    /// Creates a renderer writing to `emitter` with the default configuration.
    pub fn with_emitter(emitter: impl ProtocolEmitter) -> Self {
        Self::with_emitter_and_config(emitter, RendererConfig::default())
    }

    /// Creates a renderer writing to `emitter`.
    pub fn with_emitter_and_config(emitter: impl ProtocolEmitter, config: RendererConfig) -> Self {
        let mut renderer = Self::with_config(config);
        renderer.emitter = Some(Box::new(emitter));
        renderer
    }

    /// Opens a renderer writing RIB to `path`, or a "no context" renderer
    /// when `path` is `None`.
    pub fn open(path: Option<&Path>, config: RendererConfig) -> RendererResult<Self> {
        match path {
            Some(path) => Ok(Self::with_emitter_and_config(RibWriter::create(path)?, config)),
            None => Ok(Self::with_config(config)),
        }
    }

    /// The fully-qualified type name of this renderer.
    pub fn type_name(&self) -> &'static str {
        "Vesper::RI::Renderer"
    }

    /// The configuration this renderer was created with.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The attached emitter, if any.
    pub fn emitter(&self) -> Option<&dyn ProtocolEmitter> {
        self.emitter.as_deref()
    }

    /// The attached emitter downcast to its concrete type.
    pub fn emitter_as<T: ProtocolEmitter>(&self) -> Option<&T> {
        self.emitter.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Mutable form of [`emitter_as`](Self::emitter_as).
    pub fn emitter_as_mut<T: ProtocolEmitter>(&mut self) -> Option<&mut T> {
        self.emitter.as_deref_mut()?.as_any_mut().downcast_mut::<T>()
    }

    /// Detaches and returns the emitter, leaving the renderer in "no context"
    /// mode.
    pub fn take_emitter(&mut self) -> Option<Box<dyn ProtocolEmitter>> {
        self.emitter.take()
    }

    /// Number of open blocks, not counting motion blocks.
    pub fn depth(&self) -> usize {
        self.stack.depth() - 1
    }

    /// Whether a world block is open.
    pub fn in_world(&self) -> bool {
        self.stack.contains(ScopeKind::World)
    }

    /// Whether a motion block is open.
    pub fn in_motion(&self) -> bool {
        self.motion.is_some()
    }

    fn emit(
        &mut self,
        call: impl FnOnce(&mut dyn ProtocolEmitter) -> io::Result<()>,
    ) -> RendererResult<()> {
        if let Some(emitter) = self.emitter.as_deref_mut() {
            call(emitter)?;
        }
        Ok(())
    }

    fn require_no_motion(&self, operation: &'static str) -> RendererResult<()> {
        if self.motion.is_some() {
            return Err(RendererError::out_of_scope(operation, OUTSIDE_MOTION));
        }
        Ok(())
    }

    fn require_world(&self, operation: &'static str) -> RendererResult<()> {
        if !self.in_world() {
            return Err(RendererError::out_of_scope(operation, IN_WORLD));
        }
        Ok(())
    }

    fn require_before_world(&self, operation: &'static str) -> RendererResult<()> {
        if self.in_world() {
            return Err(RendererError::out_of_scope(operation, BEFORE_WORLD));
        }
        Ok(())
    }

    fn require_innermost(&self, kind: ScopeKind) -> RendererResult<()> {
        let open = self.stack.innermost_scope();
        if open != Some(kind) {
            return Err(RendererError::MismatchedEnd {
                closing: kind,
                open,
            });
        }
        Ok(())
    }

    // --- Blocks ---

    /// Opens the world block. Options are frozen from here on and the
    /// transform restarts at identity.
    pub fn world_begin(&mut self) -> RendererResult<()> {
        self.require_no_motion("world_begin")?;
        if self.in_world() {
            return Err(RendererError::IllegalNesting {
                opening: ScopeKind::World,
                open: ScopeKind::World,
            });
        }
        self.emit(|e| e.begin_world())?;
        self.stack.push(ScopeKind::World);
        self.stack.set_transform(Mat4::IDENTITY);
        log::debug!("world begin with {} options", self.options.len());
        Ok(())
    }

    /// Closes the world block.
    ///
    /// Deferred procedurals are expanded first, in submission order. Fails
    /// with a nesting error, changing nothing, if any other block is still
    /// open.
    pub fn world_end(&mut self) -> RendererResult<()> {
        if self.motion.is_some() {
            return Err(RendererError::MismatchedEnd {
                closing: ScopeKind::World,
                open: Some(ScopeKind::Motion),
            });
        }
        self.require_innermost(ScopeKind::World)?;

        while let Some(entry) = self.deferred.pop_front() {
            self.expand_deferred(entry)?;
        }

        self.emit(|e| e.end_world())?;
        self.stack.pop(ScopeKind::World)?;
        log::debug!("world end");
        Ok(())
    }

    /// Opens a block scoping both the transform and the attributes.
    pub fn transform_begin(&mut self) -> RendererResult<()> {
        self.require_no_motion("transform_begin")?;
        self.emit(|e| e.begin_transform())?;
        self.stack.push(ScopeKind::Transform);
        Ok(())
    }

    /// Closes the innermost block, which must be a transform block.
    pub fn transform_end(&mut self) -> RendererResult<()> {
        self.require_no_motion("transform_end")?;
        self.require_innermost(ScopeKind::Transform)?;
        self.emit(|e| e.end_transform())?;
        self.stack.pop(ScopeKind::Transform)?;
        Ok(())
    }

    /// Opens a block scoping the transform and the attributes.
    pub fn attribute_begin(&mut self) -> RendererResult<()> {
        self.require_no_motion("attribute_begin")?;
        self.emit(|e| e.begin_attribute())?;
        self.stack.push(ScopeKind::Attribute);
        Ok(())
    }

    /// Closes the innermost block, which must be an attribute block.
    pub fn attribute_end(&mut self) -> RendererResult<()> {
        self.require_no_motion("attribute_end")?;
        self.require_innermost(ScopeKind::Attribute)?;
        self.emit(|e| e.end_attribute())?;
        self.stack.pop(ScopeKind::Attribute)?;
        Ok(())
    }

    /// Opens a motion block sampled at `times`.
    ///
    /// Each following `concat_transform` or `primitive` call supplies one
    /// sample, in order. Nothing is emitted until [`motion_end`](Self::motion_end).
    pub fn motion_begin(&mut self, times: Vec<f32>) -> RendererResult<()> {
        if self.motion.is_some() {
            return Err(RendererError::IllegalNesting {
                opening: ScopeKind::Motion,
                open: ScopeKind::Motion,
            });
        }
        self.motion = Some(MotionBlock::new(times)?);
        Ok(())
    }

    /// Closes the motion block and emits it as one statement.
    ///
    /// A block with the wrong number of samples is discarded. A transform
    /// block leaves its first sample concatenated onto the current transform.
    pub fn motion_end(&mut self) -> RendererResult<()> {
        let Some(block) = self.motion.take() else {
            return Err(RendererError::MismatchedEnd {
                closing: ScopeKind::Motion,
                open: self.stack.innermost_scope(),
            });
        };
        let (times, samples) = block.finish().inspect_err(|err| {
            log::warn!("discarding motion block: {err}");
        })?;
        self.emit(|e| e.emit_motion_block(&times, &samples))?;
        if let Some(MotionSample::Transform(first)) = samples.first() {
            self.stack.concat_transform(first);
        }
        Ok(())
    }

    // --- Transforms ---

    /// Concatenates `matrix` onto the current transform, so that it applies
    /// to object-space points first. Inside a motion block the matrix is
    /// recorded as the next sample instead.
    pub fn concat_transform(&mut self, matrix: &Mat4) -> RendererResult<()> {
        if let Some(block) = self.motion.as_mut() {
            return block.push(MotionSample::Transform(*matrix));
        }
        self.emit(|e| e.emit_transform(matrix))?;
        self.stack.concat_transform(matrix);
        Ok(())
    }

    /// Replaces the current transform.
    pub fn set_transform(&mut self, matrix: Mat4) -> RendererResult<()> {
        self.require_no_motion("set_transform")?;
        self.emit(|e| e.emit_set_transform(&matrix))?;
        self.stack.set_transform(matrix);
        Ok(())
    }

    /// Replaces the current transform with a named coordinate system.
    pub fn set_transform_to(&mut self, name: &str) -> RendererResult<()> {
        let matrix = self.get_transform_of(name)?;
        self.set_transform(matrix)
    }

    /// The current object-to-world transform.
    pub fn get_transform(&self) -> Mat4 {
        self.stack.transform()
    }

    /// The transform of a named coordinate system.
    ///
    /// `object` and `current` name the live current transform, `world` is
    /// the identity, and `camera` is the placement recorded by
    /// [`camera`](Self::camera). Other names must have been registered with
    /// [`coordinate_system`](Self::coordinate_system).
    pub fn get_transform_of(&self, name: &str) -> RendererResult<Mat4> {
        match name {
            "object" | "current" => Ok(self.stack.transform()),
            "world" => Ok(Mat4::IDENTITY),
            "camera" => self
                .camera
                .ok_or_else(|| RendererError::lookup("coordinate system", name)),
            _ => self
                .coordinate_systems
                .get(name)
                .copied()
                .ok_or_else(|| RendererError::lookup("coordinate system", name)),
        }
    }

    /// Records the current transform under `name`, replacing any previous
    /// snapshot. Later transform changes do not affect the snapshot.
    pub fn coordinate_system(&mut self, name: &str) -> RendererResult<()> {
        self.require_no_motion("coordinate_system")?;
        if matches!(name, "object" | "current" | "world" | "camera") {
            log::warn!("coordinate system name '{name}' is reserved; ignoring");
            return Ok(());
        }
        self.emit(|e| e.emit_coordinate_system(name))?;
        self.coordinate_systems
            .insert(name.to_owned(), self.stack.transform());
        Ok(())
    }

    // --- Attributes and options ---

    /// Resolves `key`, returning the key to store under, or `None` when the
    /// key is to be ignored.
    fn accept(
        &self,
        target: KeyTarget,
        key: &str,
        value: &Data,
    ) -> RendererResult<Option<ResolvedKey>> {
        let resolution = self.resolver.resolve(target, key);
        match &resolution {
            Resolution::Foreign { prefix } => {
                log::trace!("ignoring '{key}' addressed to renderer '{prefix}'");
                Ok(None)
            }
            Resolution::Unknown(_) => {
                log::warn!("ignoring unknown {} '{key}'", describe(target));
                Ok(None)
            }
            Resolution::Typed { key: resolved, .. } | Resolution::Untyped(resolved) => {
                resolution.validate(key, value)?;
                Ok(Some(resolved.clone()))
            }
        }
    }

    /// Sets an attribute in the innermost block.
    ///
    /// Native and generic schema keys are type-checked. Keys addressed to
    /// other renderers are ignored without error.
    pub fn set_attribute(&mut self, key: &str, value: Data) -> RendererResult<()> {
        self.require_no_motion("set_attribute")?;
        let Some(resolved) = self.accept(KeyTarget::Attribute, key, &value)? else {
            return Ok(());
        };
        self.emit(|e| e.emit_attribute(&resolved, &value))?;
        let slot = self.resolver.canonical(&resolved);
        self.stack.set_attribute(&slot, value);
        Ok(())
    }

    /// The value of an attribute in the innermost block, falling back to its
    /// schema default.
    pub fn get_attribute(&self, key: &str) -> RendererResult<Data> {
        self.lookup(KeyTarget::Attribute, key, self.stack.attributes())
    }

    /// Sets a global option.
    ///
    /// Options are frozen once the world block opens. What happens to late
    /// options is governed by [`WorldOptionPolicy`].
    pub fn set_option(&mut self, key: &str, value: Data) -> RendererResult<()> {
        self.require_no_motion("set_option")?;
        let Some(resolved) = self.accept(KeyTarget::Option, key, &value)? else {
            return Ok(());
        };
        if self.in_world() {
            return match self.config.world_option_policy {
                WorldOptionPolicy::Ignore => {
                    log::warn!("ignoring option '{key}' set inside the world block");
                    Ok(())
                }
                WorldOptionPolicy::Reject => {
                    Err(RendererError::out_of_scope("set_option", BEFORE_WORLD))
                }
            };
        }
        self.emit(|e| e.emit_option(&resolved, &value))?;
        let slot = self.resolver.canonical(&resolved);
        self.options.insert(slot, value);
        Ok(())
    }

    /// The value of an option, falling back to its schema default.
    pub fn get_option(&self, key: &str) -> RendererResult<Data> {
        self.lookup(KeyTarget::Option, key, &self.options)
    }

    /// The option table.
    pub fn options(&self) -> &CompoundData {
        &self.options
    }

    fn lookup(&self, target: KeyTarget, key: &str, table: &CompoundData) -> RendererResult<Data> {
        let resolution = self.resolver.resolve(target, key);
        let found = match &resolution {
            Resolution::Typed { key: resolved, entry } => table
                .get(&self.resolver.canonical(resolved))
                .or(entry.default.as_ref()),
            Resolution::Untyped(resolved) => table.get(&self.resolver.canonical(resolved)),
            Resolution::Unknown(_) | Resolution::Foreign { .. } => None,
        };
        found
            .cloned()
            .ok_or_else(|| RendererError::lookup(describe(target), key))
    }

    // --- Pre-world declarations ---

    /// Declares an output image.
    pub fn display(
        &mut self,
        name: &str,
        kind: &str,
        mode: &str,
        params: &CompoundData,
    ) -> RendererResult<()> {
        self.require_no_motion("display")?;
        self.require_before_world("display")?;
        self.emit(|e| e.emit_display(name, kind, mode, params))
    }

    /// Declares the camera.
    ///
    /// A `transform` (M44f) parameter is concatenated onto the current
    /// transform first; the result becomes the `camera` coordinate system.
    /// A `shutter` (V2f) parameter also sets the `shutter` option, and
    /// `hider` (string) and `hider:*` parameters set the native hider options.
    pub fn camera(&mut self, name: &str, params: &CompoundData) -> RendererResult<()> {
        self.require_no_motion("camera")?;
        self.require_before_world("camera")?;
        let placement = match typed_param(params, "transform", DataKind::M44f)?
            .and_then(Data::as_matrix)
        {
            Some(m) => self.stack.transform() * *m,
            None => self.stack.transform(),
        };
        let shutter = typed_param(params, "shutter", DataKind::V2f)?.cloned();
        typed_param(params, "hider", DataKind::String)?;
        let hider: Vec<(String, Data)> = params
            .iter()
            .filter(|(key, _)| key.as_str() == "hider" || key.starts_with("hider:"))
            .map(|(key, value)| (format!("{}:{key}", self.config.native_prefix), value.clone()))
            .collect();

        let mut emitted = params.clone();
        emitted.insert("transform".to_owned(), Data::M44f(placement));
        self.emit(|e| e.emit_camera(name, &emitted))?;

        self.stack.set_transform(placement);
        self.camera = Some(placement);
        if let Some(shutter) = shutter {
            self.options.insert("shutter".to_owned(), shutter);
        }
        self.options.extend(hider);
        log::debug!("camera '{name}' declared");
        Ok(())
    }

    // --- World contents ---

    /// Issues a namespaced command such as `ri:readArchive`.
    ///
    /// Native commands are emitted; commands for other renderers are ignored.
    pub fn command(&mut self, name: &str, params: &CompoundData) -> RendererResult<()> {
        self.require_no_motion("command")?;
        match self.resolver.resolve(KeyTarget::Command, name) {
            Resolution::Typed { key, entry } => {
                match params.get("name") {
                    Some(value) if value.kind() != entry.kind => {
                        return Err(RendererError::TypeMismatch {
                            key: format!("{name} name"),
                            expected: entry.kind,
                            found: value.kind(),
                        });
                    }
                    Some(_) => {}
                    None => return Err(RendererError::lookup("command parameter", "name")),
                }
                self.emit(|e| e.emit_command(&key.name, params))
            }
            Resolution::Foreign { prefix } => {
                log::trace!("ignoring command '{name}' addressed to renderer '{prefix}'");
                Ok(())
            }
            Resolution::Untyped(_) | Resolution::Unknown(_) => {
                log::warn!("ignoring unknown command '{name}'");
                Ok(())
            }
        }
    }

    /// Binds a shader in the innermost block.
    pub fn shader(
        &mut self,
        kind: ShaderType,
        name: &str,
        params: &CompoundData,
    ) -> RendererResult<()> {
        self.require_no_motion("shader")?;
        self.require_world("shader")?;
        self.emit(|e| e.emit_shader(kind, name, params))?;
        if kind != ShaderType::Light {
            self.stack.bind_shader(kind, ShaderBinding::new(name, params.clone()));
        }
        Ok(())
    }

    /// The shader bound to `kind` in the innermost block. Light sources are
    /// never reported.
    pub fn shader_binding(&self, kind: ShaderType) -> Option<&ShaderBinding> {
        self.stack.shader(kind)
    }

    /// Submits a primitive. Inside a motion block the primitive is recorded
    /// as the next sample.
    pub fn primitive(&mut self, primitive: Primitive) -> RendererResult<()> {
        self.require_world("primitive")?;
        if let Some(block) = self.motion.as_mut() {
            return block.push(MotionSample::Primitive(primitive));
        }
        self.emit(|e| e.emit_primitive(&primitive))
    }

    /// Submits a procedural.
    ///
    /// The bound is queried immediately. Expansion happens now or at
    /// `world_end` depending on [`ProceduralExpansion`]. Failures inside the
    /// procedural are logged and do not fail this call.
    pub fn procedural(
        &mut self,
        handle: Box<dyn Procedural>,
        args: CompoundData,
    ) -> RendererResult<()> {
        self.require_no_motion("procedural")?;
        self.require_world("procedural")?;
        let bound = match handle.bound(&args) {
            Ok(bound) if bound.is_valid() => bound,
            Ok(_) => {
                log::warn!("dropping procedural with an empty bound");
                return Ok(());
            }
            Err(err) => {
                log::error!("dropping procedural, bound query failed: {err:#}");
                return Ok(());
            }
        };

        match self.config.procedural_expansion {
            ProceduralExpansion::Immediate => {
                self.emit(|e| e.begin_attribute())?;
                self.stack.push(ScopeKind::Procedural);
                self.run_procedural(handle.as_ref(), &args, &bound, Ok(()))
            }
            ProceduralExpansion::Deferred => {
                log::trace!("deferring procedural ({} queued)", self.deferred.len() + 1);
                self.deferred.push_back(DeferredProcedural {
                    handle,
                    args,
                    bound,
                    frame: self.stack.top().clone(),
                });
                Ok(())
            }
        }
    }

    /// Expands a queued procedural inside the state it was submitted with.
    ///
    /// The emitted block starts from the world frame, so everything the
    /// captured frame holds differently is re-issued: the absolute transform,
    /// shader bindings and attributes. World-level attributes set after
    /// submission are reset to their schema default where one exists.
    fn expand_deferred(&mut self, entry: DeferredProcedural) -> RendererResult<()> {
        let DeferredProcedural {
            handle,
            args,
            bound,
            mut frame,
        } = entry;
        let (shaders, attributes) = self.restore_context(&mut frame);
        let transform = frame.transform;

        self.emit(|e| e.begin_attribute())?;
        self.stack.push_frame(ScopeKind::Procedural, frame);

        let mut restored = self.emit(|e| e.emit_set_transform(&transform));
        for (kind, binding) in &shaders {
            restored = restored.and_then(|()| {
                self.emit(|e| e.emit_shader(*kind, &binding.name, &binding.params))
            });
        }
        for (key, value) in &attributes {
            restored = restored.and_then(|()| self.emit(|e| e.emit_attribute(key, value)));
        }

        self.run_procedural(handle.as_ref(), &args, &bound, restored)
    }

    /// Compares a captured frame with the world frame and returns the shader
    /// bindings and attributes to emit so the two agree. World state with no
    /// way back to a default is merged into `frame` instead, keeping the
    /// tracked state equal to the emitted one.
    fn restore_context(
        &self,
        frame: &mut StateFrame,
    ) -> (Vec<(ShaderType, ShaderBinding)>, Vec<(ResolvedKey, Data)>) {
        let world = self.stack.top();

        let shaders: Vec<(ShaderType, ShaderBinding)> = frame
            .shaders
            .iter()
            .filter(|(kind, binding)| world.shaders.get(*kind) != Some(*binding))
            .map(|(kind, binding)| (*kind, binding.clone()))
            .collect();
        for (kind, binding) in &world.shaders {
            if let Entry::Vacant(slot) = frame.shaders.entry(*kind) {
                log::debug!("deferred procedural inherits {kind} shader '{}'", binding.name);
                slot.insert(binding.clone());
            }
        }

        let mut attributes = Vec::new();
        for (slot, value) in &frame.attributes {
            if world.attributes.get(slot) == Some(value) {
                continue;
            }
            if let Some(key) = self.resolver.resolve(KeyTarget::Attribute, slot).key() {
                attributes.push((key.clone(), value.clone()));
            }
        }
        for (slot, value) in &world.attributes {
            if frame.attributes.contains_key(slot) {
                continue;
            }
            match self.resolver.resolve(KeyTarget::Attribute, slot) {
                Resolution::Typed {
                    key,
                    entry: SchemaEntry {
                        default: Some(default),
                        ..
                    },
                } => {
                    if default != *value {
                        attributes.push((key, default));
                    }
                }
                _ => {
                    log::debug!("deferred procedural inherits attribute '{slot}'");
                    frame.attributes.insert(slot.clone(), value.clone());
                }
            }
        }

        (shaders, attributes)
    }

    /// Runs a procedural inside the `Procedural` frame pushed by the caller,
    /// then closes that frame along with anything the procedural left open.
    /// The callback is skipped if `prelude` failed.
    fn run_procedural(
        &mut self,
        handle: &dyn Procedural,
        args: &CompoundData,
        bound: &Aabb,
        prelude: RendererResult<()>,
    ) -> RendererResult<()> {
        let depth = self.stack.depth();
        let emitted = prelude.and_then(|()| self.emit(|e| e.emit_bound(bound)));

        if emitted.is_ok() {
            if let Err(err) = handle.render(self, args) {
                log::error!("procedural render failed: {err:#}");
            }
        }

        if self.motion.take().is_some() {
            log::warn!("procedural left a motion block open; discarding it");
        }
        let mut result = emitted;
        for kind in self.stack.unwind_to(depth) {
            log::warn!("procedural left a {kind} block open; closing it");
            let closed = match kind {
                ScopeKind::Transform => self.emit(|e| e.end_transform()),
                _ => self.emit(|e| e.end_attribute()),
            };
            result = result.and(closed);
        }
        self.stack.pop(ScopeKind::Procedural)?;
        result.and(self.emit(|e| e.end_attribute()))
    }
}

fn describe(target: KeyTarget) -> &'static str {
    match target {
        KeyTarget::Attribute => "attribute",
        KeyTarget::Option => "option",
        KeyTarget::Command => "command",
    }
}

fn typed_param<'a>(
    params: &'a CompoundData,
    name: &str,
    kind: DataKind,
) -> RendererResult<Option<&'a Data>> {
    match params.get(name) {
        Some(value) if value.kind() != kind => Err(RendererError::TypeMismatch {
            key: name.to_owned(),
            expected: kind,
            found: value.kind(),
        }),
        found => Ok(found),
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("depth", &self.depth())
            .field("in_motion", &self.in_motion())
            .field("options", &self.options)
            .field("coordinate_systems", &self.coordinate_systems.len())
            .field("deferred", &self.deferred.len())
            .field("has_emitter", &self.emitter.is_some())
            .finish()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.in_world() {
            log::warn!("renderer dropped with the world block still open");
        }
        if let Some(emitter) = self.emitter.as_deref_mut() {
            if let Err(err) = emitter.flush() {
                log::error!("failed to flush protocol emitter: {err}");
            }
        }
    }
}
