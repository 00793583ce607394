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

//! Integration tests for procedural expansion.

use std::cell::Cell;
use std::rc::Rc;
use vesper_core::math::{Aabb, Mat4, Vec3};
use vesper_core::{CompoundData, Data};
use vesper_ri::{
    DelayedReadArchive, EmittedCall, ErrorKind, Primitive, Procedural, ProceduralExpansion,
    RecordingEmitter, Renderer, RendererConfig, RibWriter, ShaderType,
};

/// A procedural whose behavior is chosen per test.
struct Scripted {
    renders: Rc<Cell<usize>>,
    bound: anyhow::Result<Aabb>,
    body: fn(&mut Renderer) -> anyhow::Result<()>,
}

impl Scripted {
    fn new(body: fn(&mut Renderer) -> anyhow::Result<()>) -> (Self, Rc<Cell<usize>>) {
        let renders = Rc::new(Cell::new(0));
        let procedural = Self {
            renders: renders.clone(),
            bound: Ok(Aabb::from_min_max(Vec3::splat(-1.0), Vec3::ONE)),
            body,
        };
        (procedural, renders)
    }
}

impl Procedural for Scripted {
    fn bound(&self, _args: &CompoundData) -> anyhow::Result<Aabb> {
        match &self.bound {
            Ok(b) => Ok(*b),
            Err(e) => Err(anyhow::anyhow!("{e}")),
        }
    }

    fn render(&self, renderer: &mut Renderer, _args: &CompoundData) -> anyhow::Result<()> {
        self.renders.set(self.renders.get() + 1);
        (self.body)(renderer)
    }
}

fn renderer(expansion: ProceduralExpansion) -> Renderer {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = RendererConfig::new().with_procedural_expansion(expansion);
    let mut r = Renderer::with_emitter_and_config(RecordingEmitter::new(), config);
    r.world_begin().unwrap();
    r
}

fn calls(r: &Renderer) -> Vec<EmittedCall> {
    r.emitter_as::<RecordingEmitter>().unwrap().calls().to_vec()
}

fn messy(r: &mut Renderer) -> anyhow::Result<()> {
    r.concat_transform(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)))?;
    r.set_attribute("ri:shadingRate", Data::Float(8.0))?;
    r.attribute_begin()?;
    r.transform_begin()?;
    r.primitive(Primitive::new("Sphere").with_argument(1.0_f32))?;
    Ok(())
}

fn ball(r: &mut Renderer) -> anyhow::Result<()> {
    r.primitive(Primitive::new("Sphere").with_argument(1.0_f32))?;
    Ok(())
}

fn rib_renderer() -> Renderer {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut r = Renderer::with_emitter_and_config(
        RibWriter::new(Vec::new()),
        RendererConfig::deferred(),
    );
    r.world_begin().unwrap();
    r
}

/// The RIB text of the last top-level attribute block, which is where a
/// deferred procedural expands.
fn last_block(r: &Renderer) -> String {
    let rib = String::from_utf8(
        r.emitter_as::<RibWriter<Vec<u8>>>()
            .unwrap()
            .get_ref()
            .clone(),
    )
    .unwrap();
    let start = rib.rfind("  AttributeBegin\n").expect("procedural block");
    rib[start..].to_owned()
}

fn failing(r: &mut Renderer) -> anyhow::Result<()> {
    r.attribute_begin()?;
    anyhow::bail!("generator crashed")
}

#[test]
fn test_procedural_isolation() {
    let mut r = renderer(ProceduralExpansion::Immediate);
    r.set_attribute("ri:shadingRate", Data::Float(1.0)).unwrap();
    let (procedural, renders) = Scripted::new(messy);

    r.procedural(Box::new(procedural), CompoundData::new()).unwrap();

    assert_eq!(renders.get(), 1);
    assert_eq!(r.depth(), 1);
    assert_eq!(r.get_transform(), Mat4::IDENTITY);
    assert_eq!(r.get_attribute("ri:shadingRate").unwrap(), Data::Float(1.0));

    let calls = calls(&r);
    let opened = calls
        .iter()
        .filter(|c| matches!(c, EmittedCall::BeginAttribute | EmittedCall::BeginTransform))
        .count();
    let closed = calls
        .iter()
        .filter(|c| matches!(c, EmittedCall::EndAttribute | EmittedCall::EndTransform))
        .count();
    assert_eq!(opened, closed);
    assert!(calls.iter().any(|c| matches!(c, EmittedCall::Bound(_))));

    r.world_end().unwrap();
}

#[test]
fn test_callback_error_is_swallowed() {
    let mut r = renderer(ProceduralExpansion::Immediate);
    let (procedural, renders) = Scripted::new(failing);
    r.procedural(Box::new(procedural), CompoundData::new()).unwrap();
    assert_eq!(renders.get(), 1);
    assert_eq!(r.depth(), 1);
    r.world_end().unwrap();
}

#[test]
fn test_bound_failure_drops_procedural() {
    let mut r = renderer(ProceduralExpansion::Immediate);
    let (mut procedural, renders) = Scripted::new(messy);
    procedural.bound = Err(anyhow::anyhow!("no bound"));
    r.procedural(Box::new(procedural), CompoundData::new()).unwrap();

    let (mut empty, empty_renders) = Scripted::new(messy);
    empty.bound = Ok(Aabb::INVALID);
    r.procedural(Box::new(empty), CompoundData::new()).unwrap();

    assert_eq!(renders.get(), 0);
    assert_eq!(empty_renders.get(), 0);
    assert_eq!(calls(&r), vec![EmittedCall::BeginWorld]);
}

#[test]
fn test_procedural_outside_world_is_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut r = Renderer::new();
    let (procedural, renders) = Scripted::new(messy);
    let err = r.procedural(Box::new(procedural), CompoundData::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(renders.get(), 0);
}

#[test]
fn test_deferred_expansion_runs_before_world_end() {
    let mut r = renderer(ProceduralExpansion::Deferred);
    r.set_attribute("user:layer", Data::from("props")).unwrap();
    let placement = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
    r.attribute_begin().unwrap();
    r.concat_transform(&placement).unwrap();
    r.set_attribute("user:layer", Data::from("hero")).unwrap();

    let (procedural, renders) = Scripted::new(|r| {
        assert_eq!(r.get_attribute("user:layer")?, Data::from("hero"));
        r.primitive(Primitive::new("Sphere").with_argument(1.0_f32))?;
        Ok(())
    });
    r.procedural(Box::new(procedural), CompoundData::new()).unwrap();
    assert_eq!(renders.get(), 0);

    r.attribute_end().unwrap();
    r.world_end().unwrap();
    assert_eq!(renders.get(), 1);

    let calls = calls(&r);
    let sphere = calls
        .iter()
        .position(|c| matches!(c, EmittedCall::Primitive(_)))
        .expect("deferred primitive emitted");
    let end = calls
        .iter()
        .position(|c| *c == EmittedCall::EndWorld)
        .unwrap();
    assert!(sphere < end);
    assert!(calls.contains(&EmittedCall::SetTransform(placement)));
}

#[test]
fn test_deferred_procedurals_queued_during_expansion_are_expanded() {
    let mut r = renderer(ProceduralExpansion::Deferred);
    let (outer, outer_renders) = Scripted::new(|r| {
        let (inner, _) = Scripted::new(|r| {
            r.primitive(Primitive::new("Disk"))?;
            Ok(())
        });
        r.procedural(Box::new(inner), CompoundData::new())?;
        Ok(())
    });
    r.procedural(Box::new(outer), CompoundData::new()).unwrap();
    r.world_end().unwrap();

    assert_eq!(outer_renders.get(), 1);
    assert!(calls(&r)
        .iter()
        .any(|c| matches!(c, EmittedCall::Primitive(p) if p.kind == "Disk")));
}

#[test]
fn test_delayed_read_archive() {
    let mut r = renderer(ProceduralExpansion::Immediate);
    let archive = DelayedReadArchive::new(
        "set/chair.rib",
        Aabb::from_min_max(Vec3::ZERO, Vec3::ONE),
    );
    r.procedural(Box::new(archive), CompoundData::new()).unwrap();
    assert!(calls(&r).iter().any(|c| matches!(
        c,
        EmittedCall::Command { name, params }
            if name == "readArchive"
                && params.get("name") == Some(&Data::from("set/chair.rib"))
    )));
}

#[test]
fn test_deferred_expansion_rebinds_shaders() {
    let mut r = rib_renderer();
    r.attribute_begin().unwrap();
    let mut params = CompoundData::new();
    params.insert("Kd".to_owned(), Data::Float(0.5));
    r.shader(ShaderType::Surface, "plastic", &params).unwrap();

    let (procedural, renders) = Scripted::new(|r| {
        let binding = r.shader_binding(ShaderType::Surface).expect("surface bound");
        assert_eq!(binding.name, "plastic");
        ball(r)
    });
    r.procedural(Box::new(procedural), CompoundData::new()).unwrap();
    r.attribute_end().unwrap();
    r.world_end().unwrap();

    assert_eq!(renders.get(), 1);
    let block = last_block(&r);
    let surface = block
        .find("    Surface \"plastic\" \"float Kd\" [0.5]\n")
        .expect("shader re-issued inside the procedural block");
    let sphere = block.find("    Sphere 1\n").unwrap();
    assert!(surface < sphere);
    assert!(!block.contains("Attribute \"shader\""));
}

#[test]
fn test_deferred_expansion_ignores_later_world_state() {
    let mut r = rib_renderer();
    let (procedural, renders) = Scripted::new(|r| {
        assert_eq!(r.get_attribute("ri:matte")?, Data::Bool(false));
        assert_eq!(r.get_attribute("user:pass")?, Data::from("beauty"));
        ball(r)
    });
    r.procedural(Box::new(procedural), CompoundData::new()).unwrap();
    r.set_attribute("ri:matte", Data::Bool(true)).unwrap();
    r.set_attribute("user:pass", Data::from("beauty")).unwrap();
    r.world_end().unwrap();

    assert_eq!(renders.get(), 1);
    let block = last_block(&r);
    assert!(block.contains("    Matte 0\n"), "unexpected block:\n{block}");
    assert!(!block.contains("Matte 1"));
}
