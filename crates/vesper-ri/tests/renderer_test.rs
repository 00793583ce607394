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

//! Integration tests for block structure, attribute scoping and namespaces.

use approx::assert_abs_diff_eq;
use vesper_core::math::{Color3, Mat4, Vec2, Vec3};
use vesper_core::{CompoundData, Data};
use vesper_ri::namespace::{Namespace, ResolvedKey};
use vesper_ri::{
    AttributeState, EmittedCall, ErrorKind, Group, MatrixTransform, Primitive, RecordingEmitter,
    Renderable, Renderer, RendererConfig,
};

fn recording_renderer() -> Renderer {
    let _ = env_logger::builder().is_test(true).try_init();
    Renderer::with_emitter(RecordingEmitter::new())
}

fn calls(renderer: &Renderer) -> Vec<EmittedCall> {
    renderer
        .emitter_as::<RecordingEmitter>()
        .expect("recording emitter attached")
        .calls()
        .to_vec()
}

#[test]
fn test_stack_balance() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    r.transform_begin().unwrap();
    r.attribute_begin().unwrap();

    let err = r.transform_end().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Nesting);

    r.attribute_end().unwrap();
    r.transform_end().unwrap();
    r.world_end().unwrap();
    assert_eq!(r.depth(), 0);

    let err = r.attribute_end().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Nesting);
}

#[test]
fn test_attribute_scoping() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    r.set_attribute("ri:shadingRate", Data::Float(1.0)).unwrap();

    r.attribute_begin().unwrap();
    r.set_attribute("ri:shadingRate", Data::Float(4.0)).unwrap();
    r.set_attribute("user:tag", Data::from("inner")).unwrap();
    assert_eq!(r.get_attribute("ri:shadingRate").unwrap(), Data::Float(4.0));
    r.attribute_end().unwrap();

    assert_eq!(r.get_attribute("ri:shadingRate").unwrap(), Data::Float(1.0));
    assert_eq!(
        r.get_attribute("user:tag").unwrap_err().kind(),
        ErrorKind::Lookup
    );
    r.world_end().unwrap();
}

#[test]
fn test_transform_block_scopes_attributes_too() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    r.transform_begin().unwrap();
    r.concat_transform(&Mat4::from_translation(Vec3::X)).unwrap();
    r.set_attribute("ri:matte", Data::Bool(true)).unwrap();
    r.transform_end().unwrap();

    assert_eq!(r.get_transform(), Mat4::IDENTITY);
    assert_eq!(r.get_attribute("ri:matte").unwrap(), Data::Bool(false));
}

#[test]
fn test_schema_defaults() {
    let r = Renderer::new();
    assert_eq!(r.get_option("shutter").unwrap(), Data::V2f(Vec2::new(0.0, 0.0)));
    assert_eq!(r.get_attribute("ri:sides").unwrap(), Data::Int(2));
    assert_eq!(
        r.get_attribute("ri:color").unwrap(),
        Data::Color3f(Color3::WHITE)
    );
    assert_eq!(r.get_attribute("doubleSided").unwrap(), Data::Bool(true));
    assert_eq!(
        r.get_option("ri:searchpath:shader").unwrap_err().kind(),
        ErrorKind::Lookup
    );
}

#[test]
fn test_coordinate_system_snapshot_is_immutable() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    r.concat_transform(&m).unwrap();
    r.coordinate_system("lamp").unwrap();

    r.concat_transform(&Mat4::from_scale(Vec3::splat(4.0))).unwrap();
    assert_abs_diff_eq!(r.get_transform_of("lamp").unwrap(), m, epsilon = 1e-6);

    r.world_end().unwrap();
    assert_abs_diff_eq!(r.get_transform_of("lamp").unwrap(), m, epsilon = 1e-6);
    assert_eq!(
        r.get_transform_of("nowhere").unwrap_err().kind(),
        ErrorKind::Lookup
    );
}

#[test]
fn test_coordinate_system_overwrite() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    r.coordinate_system("marker").unwrap();
    let m = Mat4::from_rotation_y(0.5);
    r.concat_transform(&m).unwrap();
    r.coordinate_system("marker").unwrap();
    assert_eq!(r.get_transform_of("marker").unwrap(), m);
    assert_eq!(r.get_transform_of("world").unwrap(), Mat4::IDENTITY);
    assert_eq!(r.get_transform_of("object").unwrap(), m);
}

#[test]
fn test_namespace_policy() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    let before = calls(&r).len();

    r.set_attribute("someOtherRenderer:someOtherAttribute", Data::Int(10))
        .unwrap();
    r.set_attribute("ri:sparkle", Data::Int(1)).unwrap();
    assert_eq!(calls(&r).len(), before);
    assert_eq!(
        r.get_attribute("someOtherRenderer:someOtherAttribute")
            .unwrap_err()
            .kind(),
        ErrorKind::Lookup
    );

    let err = r
        .set_attribute("ri:shadingRate", Data::from("fast"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(calls(&r).len(), before);

    r.set_attribute("user:magic", Data::Int(42)).unwrap();
    assert_eq!(r.get_attribute("user:magic").unwrap(), Data::Int(42));
    assert_eq!(
        calls(&r).last(),
        Some(&EmittedCall::Attribute {
            key: ResolvedKey::new(Namespace::User, "magic"),
            value: Data::Int(42),
        })
    );
}

#[test]
fn test_dot_and_colon_keys_share_a_slot() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    r.set_attribute("ri.sides", Data::Int(1)).unwrap();
    assert_eq!(r.get_attribute("ri:sides").unwrap(), Data::Int(1));
}

#[test]
fn test_custom_native_prefix() {
    let config = RendererConfig::new().with_native_prefix("sample");
    let mut r = Renderer::with_config(config);
    r.world_begin().unwrap();
    r.set_attribute("sample:shadingRate", Data::Float(3.0)).unwrap();
    r.set_attribute("ri:shadingRate", Data::from("ignored")).unwrap();
    assert_eq!(
        r.get_attribute("sample:shadingRate").unwrap(),
        Data::Float(3.0)
    );
}

#[test]
fn test_end_to_end_attribute_emission() {
    let mut r = recording_renderer();
    r.set_option("user:magicNumber", Data::Int(7)).unwrap();
    r.world_begin().unwrap();
    let options_at_begin = r.options().clone();

    r.set_attribute("ri:shadingRate", Data::Float(2.0)).unwrap();
    r.world_end().unwrap();

    let calls = calls(&r);
    let attributes: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, EmittedCall::Attribute { .. }))
        .map(|(i, _)| i)
        .collect();
    let end = calls
        .iter()
        .position(|c| *c == EmittedCall::EndWorld)
        .expect("world end emitted");

    assert_eq!(attributes.len(), 1);
    assert!(attributes[0] < end);
    assert_eq!(
        calls[attributes[0]],
        EmittedCall::Attribute {
            key: ResolvedKey::new(Namespace::Native, "shadingRate"),
            value: Data::Float(2.0),
        }
    );
    assert_eq!(r.options(), &options_at_begin);
}

#[test]
fn test_primitive_outside_world_is_rejected() {
    let mut r = recording_renderer();
    let err = r.primitive(Primitive::new("Sphere")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[test]
fn test_display_only_before_world() {
    let mut r = recording_renderer();
    r.display("out.exr", "openexr", "rgba", &CompoundData::new())
        .unwrap();
    r.world_begin().unwrap();
    let err = r
        .display("late.exr", "openexr", "rgba", &CompoundData::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[test]
fn test_group_renders_inside_attribute_block() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    let group = Group::new()
        .with_transform(Mat4::from_translation(Vec3::Y))
        .with_state(AttributeState::new().with("ri:matte", true))
        .with_child(MatrixTransform::new(Mat4::from_scale(Vec3::splat(2.0))))
        .with_child(Primitive::new("Sphere").with_argument(1.0_f32));
    group.render(&mut r).unwrap();

    assert_eq!(r.depth(), 1);
    assert_eq!(r.get_transform(), Mat4::IDENTITY);
    let calls = calls(&r);
    assert_eq!(calls[1], EmittedCall::BeginAttribute);
    assert_eq!(calls.last(), Some(&EmittedCall::EndAttribute));
    assert!(calls
        .iter()
        .any(|c| matches!(c, EmittedCall::Primitive(p) if p.kind == "Sphere")));
}

#[test]
fn test_group_closes_its_block_on_error() {
    let mut r = recording_renderer();
    r.world_begin().unwrap();
    let group = Group::new().with_state(AttributeState::new().with("ri:sides", "two"));
    let err = group.render(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(r.depth(), 1);
}

#[test]
fn test_no_context_mode_tracks_state() {
    let mut r = Renderer::new();
    assert!(r.emitter().is_none());
    r.world_begin().unwrap();
    r.set_attribute("ri:shadingRate", Data::Float(0.5)).unwrap();
    assert_eq!(r.get_attribute("ri:shadingRate").unwrap(), Data::Float(0.5));
    r.world_end().unwrap();
}
