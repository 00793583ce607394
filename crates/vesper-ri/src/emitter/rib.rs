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

//! Textual RIB output.

use super::ProtocolEmitter;
use crate::motion::MotionSample;
use crate::namespace::{Namespace, ResolvedKey};
use crate::primitive::Primitive;
use crate::renderable::ShaderType;
use std::any::Any;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use vesper_core::math::{Aabb, Mat4};
use vesper_core::{CompoundData, Data, DataKind};

const INDENT: &[u8] = b"  ";

/// Writes calls as indented RIB text.
pub struct RibWriter<W: Write> {
    out: W,
    depth: usize,
    next_light: u32,
    hider: String,
}

impl RibWriter<BufWriter<File>> {
    /// Creates (or truncates) a RIB file and writes the RIB header to it.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        log::debug!("writing RIB to {}", path.as_ref().display());
        Self::with_header(BufWriter::new(file))
    }
}

impl<W: Write> RibWriter<W> {
    /// Wraps `out` without writing anything yet.
    pub fn new(out: W) -> Self {
        Self {
            out,
            depth: 0,
            next_light: 1,
            hider: String::from("hidden"),
        }
    }

    /// Wraps `out` and writes the RIB header.
    pub fn with_header(out: W) -> io::Result<Self> {
        let mut writer = Self::new(out);
        writer.line(format_args!("##RenderMan RIB"))?;
        writer.line(format_args!("version 3.04"))?;
        Ok(writer)
    }

    /// The underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Unwraps the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(INDENT)?;
        }
        self.out.write_fmt(args)?;
        self.out.write_all(b"\n")
    }

    fn open(&mut self, keyword: &str) -> io::Result<()> {
        self.line(format_args!("{keyword}"))?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self, keyword: &str) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.line(format_args!("{keyword}"))
    }

    fn write_primitive(&mut self, primitive: &Primitive) -> io::Result<()> {
        let mut text = primitive.kind.clone();
        for argument in &primitive.arguments {
            text.push(' ');
            text.push_str(&argument_text(argument));
        }
        push_parameters(&mut text, primitive.variables.iter(), false);
        self.line(format_args!("{text}"))
    }

    /// `Hider "type" params...`. Hider parameters are only meaningful on a
    /// `Hider` statement, so each one repeats the current hider type.
    fn write_hider<'a>(
        &mut self,
        hider: Option<&str>,
        params: impl Iterator<Item = (&'a str, &'a Data)>,
    ) -> io::Result<()> {
        if let Some(hider) = hider {
            self.hider = hider.to_owned();
        }
        let mut text = format!("Hider {}", quoted(&self.hider));
        push_parameters(&mut text, params, true);
        self.line(format_args!("{text}"))
    }

    fn write_named(&mut self, statement: &str, group: &str, name: &str, value: &Data) -> io::Result<()> {
        self.line(format_args!(
            "{statement} {} {}",
            quoted(group),
            parameter(name, value, true)
        ))
    }
}

impl<W: Write + 'static> ProtocolEmitter for RibWriter<W> {
    fn emit_option(&mut self, key: &ResolvedKey, value: &Data) -> io::Result<()> {
        match (key.namespace, key.split()) {
            (Namespace::Native, ("hider", None)) => match value.as_str() {
                Some(hider) => self.write_hider(Some(hider), std::iter::empty()),
                None => Ok(()),
            },
            (Namespace::Native, ("hider", Some(param))) => {
                self.write_hider(None, std::iter::once((param, value)))
            }
            (Namespace::Native, (group, Some(param))) => {
                self.write_named("Option", group, param, value)
            }
            (Namespace::User, _) => self.write_named("Option", "user", &key.name, value),
            (Namespace::Generic, ("shutter", None)) => match value.to_floats() {
                Some(times) => self.line(format_args!("Shutter {}", floats(&times))),
                None => Ok(()),
            },
            _ => {
                log::debug!("no RIB statement for option '{}'", key.name);
                Ok(())
            }
        }
    }

    fn emit_attribute(&mut self, key: &ResolvedKey, value: &Data) -> io::Result<()> {
        let bare = value_list(value);
        match (key.namespace, key.name.as_str()) {
            (Namespace::Native, "shadingRate") => self.line(format_args!("ShadingRate {bare}")),
            (Namespace::Native, "matte") => self.line(format_args!("Matte {bare}")),
            (Namespace::Native, "color") => self.line(format_args!("Color [{bare}]")),
            (Namespace::Native, "opacity") => self.line(format_args!("Opacity [{bare}]")),
            (Namespace::Native, "sides") => self.line(format_args!("Sides {bare}")),
            (Namespace::Native, "geometricApproximation:motionFactor") => {
                self.line(format_args!("GeometricApproximation \"motionfactor\" {bare}"))
            }
            (Namespace::Native, "geometricApproximation:focusFactor") => {
                self.line(format_args!("GeometricApproximation \"focusfactor\" {bare}"))
            }
            (Namespace::Native, _) => match key.split() {
                (group, Some(param)) => self.write_named("Attribute", group, param, value),
                (name, None) => {
                    log::debug!("no RIB statement for attribute '{name}'");
                    Ok(())
                }
            },
            (Namespace::User, name) => self.write_named("Attribute", "user", name, value),
            (Namespace::Generic, "name") => self.write_named("Attribute", "identifier", "name", value),
            (Namespace::Generic, "doubleSided") => {
                let sides = if value.as_bool().unwrap_or(true) { 2 } else { 1 };
                self.line(format_args!("Sides {sides}"))
            }
            (Namespace::Generic, name) => {
                log::debug!("no RIB statement for attribute '{name}'");
                Ok(())
            }
        }
    }

    fn emit_transform(&mut self, matrix: &Mat4) -> io::Result<()> {
        self.line(format_args!("ConcatTransform {}", matrix_text(matrix)))
    }

    fn emit_set_transform(&mut self, matrix: &Mat4) -> io::Result<()> {
        self.line(format_args!("Transform {}", matrix_text(matrix)))
    }

    fn emit_primitive(&mut self, primitive: &Primitive) -> io::Result<()> {
        self.write_primitive(primitive)
    }

    fn emit_motion_block(&mut self, times: &[f32], samples: &[MotionSample]) -> io::Result<()> {
        self.open(&format!("MotionBegin [{}]", floats(times)))?;
        for sample in samples {
            match sample {
                MotionSample::Transform(m) => self.emit_transform(m)?,
                MotionSample::Primitive(p) => self.write_primitive(p)?,
            }
        }
        self.close("MotionEnd")
    }

    fn emit_display(
        &mut self,
        name: &str,
        kind: &str,
        mode: &str,
        params: &CompoundData,
    ) -> io::Result<()> {
        let mut text = format!("Display {} {} {}", quoted(name), quoted(kind), quoted(mode));
        push_parameters(&mut text, params.iter(), true);
        self.line(format_args!("{text}"))
    }

    fn emit_camera(&mut self, name: &str, params: &CompoundData) -> io::Result<()> {
        if let Some(Data::V2i(res)) = params.get("resolution") {
            let aspect = params
                .get("pixelAspectRatio")
                .and_then(Data::as_float)
                .unwrap_or(1.0);
            self.line(format_args!("Format {} {} {aspect}", res.x, res.y))?;
        }
        if let Some(window) = param_of(params, "screenWindow", DataKind::Box2f) {
            self.line(format_args!("ScreenWindow {}", value_list(window)))?;
        }
        if let Some(window) = param_of(params, "cropWindow", DataKind::Box2f) {
            self.line(format_args!("CropWindow {}", value_list(window)))?;
        }
        if let Some(planes) = param_of(params, "clippingPlanes", DataKind::V2f) {
            self.line(format_args!("Clipping {}", value_list(planes)))?;
        }
        if let Some(shutter) = param_of(params, "shutter", DataKind::V2f) {
            self.line(format_args!("Shutter {}", value_list(shutter)))?;
        }
        let hider = params.get("hider").and_then(Data::as_str);
        let hider_params: Vec<(&str, &Data)> = params
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("hider:").map(|k| (k, v)))
            .collect();
        if hider.is_some() || !hider_params.is_empty() {
            self.write_hider(hider, hider_params.into_iter())?;
        }
        if let Some(projection) = params.get("projection").and_then(Data::as_str) {
            let mut text = format!("Projection {}", quoted(projection));
            let extra = params
                .iter()
                .filter_map(|(k, v)| k.strip_prefix("projection:").map(|k| (k, v)));
            push_parameters(&mut text, extra, true);
            self.line(format_args!("{text}"))?;
        }
        if let Some(m) = params.get("transform").and_then(Data::as_matrix) {
            self.emit_set_transform(m)?;
        }
        self.line(format_args!("Camera {}", quoted(name)))
    }

    fn emit_command(&mut self, name: &str, params: &CompoundData) -> io::Result<()> {
        match (name, params.get("name").and_then(Data::as_str)) {
            ("readArchive", Some(file)) => self.line(format_args!("ReadArchive {}", quoted(file))),
            _ => {
                log::warn!("no RIB statement for command '{name}'");
                Ok(())
            }
        }
    }

    fn emit_shader(
        &mut self,
        kind: ShaderType,
        name: &str,
        params: &CompoundData,
    ) -> io::Result<()> {
        let mut text = format!("{} {}", kind.statement(), quoted(name));
        if kind == ShaderType::Light {
            text.push_str(&format!(" {}", self.next_light));
            self.next_light += 1;
        }
        push_parameters(&mut text, params.iter(), true);
        self.line(format_args!("{text}"))
    }

    fn emit_coordinate_system(&mut self, name: &str) -> io::Result<()> {
        self.line(format_args!("CoordinateSystem {}", quoted(name)))
    }

    fn emit_bound(&mut self, bound: &Aabb) -> io::Result<()> {
        self.line(format_args!("Bound {}", floats(&bound.to_bound_array())))
    }

    fn begin_world(&mut self) -> io::Result<()> {
        self.open("WorldBegin")
    }

    fn end_world(&mut self) -> io::Result<()> {
        self.close("WorldEnd")?;
        self.out.flush()
    }

    fn begin_attribute(&mut self) -> io::Result<()> {
        self.open("AttributeBegin")
    }

    fn end_attribute(&mut self) -> io::Result<()> {
        self.close("AttributeEnd")
    }

    fn begin_transform(&mut self) -> io::Result<()> {
        self.open("TransformBegin")
    }

    fn end_transform(&mut self) -> io::Result<()> {
        self.close("TransformEnd")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn param_of<'a>(params: &'a CompoundData, name: &str, kind: DataKind) -> Option<&'a Data> {
    params.get(name).filter(|value| value.kind() == kind)
}

fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn floats(values: &[f32]) -> String {
    join(values.iter())
}

fn join<T: fmt::Display>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn matrix_text(matrix: &Mat4) -> String {
    format!("[{}]", floats(&matrix.to_cols_array()))
}

/// The space-separated values of `value`, without brackets.
fn value_list(value: &Data) -> String {
    match value {
        Data::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Data::Int(i) => i.to_string(),
        Data::V2i(v) => format!("{} {}", v.x, v.y),
        Data::IntVector(v) => join(v.iter()),
        Data::String(s) => quoted(s),
        Data::StringVector(v) => join(v.iter().map(|s| quoted(s))),
        other => other.to_floats().map(|f| floats(&f)).unwrap_or_default(),
    }
}

/// A positional primitive argument: arrays in brackets, scalars bare.
fn argument_text(value: &Data) -> String {
    if value.kind().is_vector() {
        format!("[{}]", value_list(value))
    } else {
        value_list(value)
    }
}

fn declaration(value: &Data, sized_arrays: bool) -> String {
    let (base, fixed) = match value {
        Data::Bool(_) | Data::Int(_) | Data::IntVector(_) => ("int", None),
        Data::V2i(_) => ("int", Some(2)),
        Data::Float(_) | Data::FloatVector(_) => ("float", None),
        Data::V2f(_) => ("float", Some(2)),
        Data::Box2f(_) => ("float", Some(4)),
        Data::Box3f(_) => ("float", Some(6)),
        Data::String(_) | Data::StringVector(_) => ("string", None),
        Data::V3f(_) | Data::V3fVector(_) => ("point", None),
        Data::Color3f(_) | Data::Color3fVector(_) => ("color", None),
        Data::M44f(_) => ("matrix", None),
    };
    let size = match fixed {
        Some(n) => Some(n),
        None if sized_arrays && value.kind().is_vector() && value.len() != 1 => Some(value.len()),
        None => None,
    };
    match size {
        Some(n) => format!("{base}[{n}]"),
        None => base.to_owned(),
    }
}

/// `"type name" [values]`, with array sizes declared inline when
/// `sized_arrays` is set.
fn parameter(name: &str, value: &Data, sized_arrays: bool) -> String {
    format!(
        "\"{} {name}\" [{}]",
        declaration(value, sized_arrays),
        value_list(value)
    )
}

fn push_parameters<'a, K: AsRef<str>>(
    text: &mut String,
    params: impl Iterator<Item = (K, &'a Data)>,
    sized_arrays: bool,
) {
    for (name, value) in params {
        text.push(' ');
        text.push_str(&parameter(name.as_ref(), value, sized_arrays));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::math::{Aabb2, Color3, IVec2, Vec2, Vec3};

    fn text(writer: RibWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner()).expect("RIB is UTF-8")
    }

    #[test]
    fn blocks_are_indented() {
        let mut w = RibWriter::new(Vec::new());
        w.begin_world().unwrap();
        w.begin_attribute().unwrap();
        w.emit_attribute(&ResolvedKey::new(Namespace::Native, "shadingRate"), &Data::Float(2.0))
            .unwrap();
        w.end_attribute().unwrap();
        w.end_world().unwrap();

        assert_eq!(
            text(w),
            "WorldBegin\n  AttributeBegin\n    ShadingRate 2\n  AttributeEnd\nWorldEnd\n"
        );
    }

    #[test]
    fn header_comes_first() {
        let w = RibWriter::with_header(Vec::new()).unwrap();
        assert!(text(w).starts_with("##RenderMan RIB\n"));
    }

    #[test]
    fn attribute_statements() {
        let mut w = RibWriter::new(Vec::new());
        w.emit_attribute(
            &ResolvedKey::new(Namespace::Native, "color"),
            &Data::Color3f(Color3::new(1.0, 0.5, 0.0)),
        )
        .unwrap();
        w.emit_attribute(&ResolvedKey::new(Namespace::Native, "cull:hidden"), &Data::Int(0))
            .unwrap();
        w.emit_attribute(&ResolvedKey::new(Namespace::User, "magic"), &Data::from("x\"y"))
            .unwrap();
        w.emit_attribute(&ResolvedKey::new(Namespace::Generic, "doubleSided"), &Data::Bool(false))
            .unwrap();

        assert_eq!(
            text(w),
            "Color [1 0.5 0]\n\
             Attribute \"cull\" \"int hidden\" [0]\n\
             Attribute \"user\" \"string magic\" [\"x\\\"y\"]\n\
             Sides 1\n"
        );
    }

    #[test]
    fn option_statements() {
        let mut w = RibWriter::new(Vec::new());
        w.emit_option(&ResolvedKey::new(Namespace::Native, "searchpath:shader"), &Data::from("@:."))
            .unwrap();
        w.emit_option(&ResolvedKey::new(Namespace::Generic, "shutter"), &Data::V2f(Vec2::new(0.0, 0.5)))
            .unwrap();
        w.emit_option(&ResolvedKey::new(Namespace::Native, "hider"), &Data::from("hidden"))
            .unwrap();

        assert_eq!(
            text(w),
            "Option \"searchpath\" \"string shader\" [\"@:.\"]\nShutter 0 0.5\nHider \"hidden\"\n"
        );
    }

    #[test]
    fn hider_options_repeat_the_hider_type() {
        let mut w = RibWriter::new(Vec::new());
        w.emit_option(&ResolvedKey::new(Namespace::Native, "hider:jitter"), &Data::Int(1))
            .unwrap();
        w.emit_option(&ResolvedKey::new(Namespace::Native, "hider"), &Data::from("stochastic"))
            .unwrap();
        w.emit_option(&ResolvedKey::new(Namespace::Native, "hider:samplemotion"), &Data::Int(0))
            .unwrap();

        assert_eq!(
            text(w),
            "Hider \"hidden\" \"int jitter\" [1]\n\
             Hider \"stochastic\"\n\
             Hider \"stochastic\" \"int samplemotion\" [0]\n"
        );
    }

    #[test]
    fn camera_writes_hider() {
        let mut w = RibWriter::new(Vec::new());
        let mut params = CompoundData::new();
        params.insert("hider".into(), Data::from("hidden"));
        params.insert("hider:jitter".into(), Data::Int(1));
        w.emit_camera("main", &params).unwrap();
        assert_eq!(
            text(w),
            "Hider \"hidden\" \"int jitter\" [1]\nCamera \"main\"\n"
        );
    }

    #[test]
    fn motion_block_wraps_samples() {
        let mut w = RibWriter::new(Vec::new());
        let samples = [
            MotionSample::Transform(Mat4::IDENTITY),
            MotionSample::Transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
        ];
        w.emit_motion_block(&[0.0, 1.0], &samples).unwrap();
        let out = text(w);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "MotionBegin [0 1]");
        assert_eq!(lines[1], "  ConcatTransform [1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1]");
        assert_eq!(lines[2], "  ConcatTransform [1 0 0 0 0 1 0 0 0 0 1 0 0 1 0 1]");
        assert_eq!(lines[3], "MotionEnd");
    }

    #[test]
    fn primitive_arguments_and_variables() {
        let mut w = RibWriter::new(Vec::new());
        let p = Primitive::new("PointsPolygons")
            .with_argument(vec![3])
            .with_argument(vec![0, 1, 2])
            .with_variable("P", vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        w.emit_primitive(&p).unwrap();
        w.emit_primitive(&Primitive::new("Sphere").with_argument(1.0_f32)).unwrap();
        assert_eq!(
            text(w),
            "PointsPolygons [3] [0 1 2] \"point P\" [0 0 0 1 0 0 0 1 0]\nSphere 1\n"
        );
    }

    #[test]
    fn camera_statements_in_order() {
        let mut w = RibWriter::new(Vec::new());
        let mut params = CompoundData::new();
        params.insert("resolution".into(), Data::V2i(IVec2::new(640, 480)));
        params.insert(
            "screenWindow".into(),
            Data::Box2f(Aabb2::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0))),
        );
        params.insert("projection".into(), Data::from("perspective"));
        params.insert("projection:fov".into(), Data::Float(45.0));
        params.insert("transform".into(), Data::M44f(Mat4::IDENTITY));
        w.emit_camera("main", &params).unwrap();

        let out = text(w);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Format 640 480 1");
        assert_eq!(lines[1], "ScreenWindow -1 1 -1 1");
        assert_eq!(lines[2], "Projection \"perspective\" \"float fov\" [45]");
        assert!(lines[3].starts_with("Transform ["));
        assert_eq!(lines[4], "Camera \"main\"");
    }

    #[test]
    fn display_declares_array_sizes() {
        let mut w = RibWriter::new(Vec::new());
        let mut params = CompoundData::new();
        params.insert("quantize".into(), Data::FloatVector(vec![0.0, 1.0, 0.0, 1.0]));
        w.emit_display("out.tif", "tiff", "rgba", &params).unwrap();
        assert_eq!(
            text(w),
            "Display \"out.tif\" \"tiff\" \"rgba\" \"float[4] quantize\" [0 1 0 1]\n"
        );
    }

    #[test]
    fn lights_are_numbered() {
        let mut w = RibWriter::new(Vec::new());
        let params = CompoundData::new();
        w.emit_shader(ShaderType::Light, "pointlight", &params).unwrap();
        w.emit_shader(ShaderType::Light, "distantlight", &params).unwrap();
        w.emit_shader(ShaderType::Surface, "plastic", &params).unwrap();
        assert_eq!(
            text(w),
            "LightSource \"pointlight\" 1\nLightSource \"distantlight\" 2\nSurface \"plastic\"\n"
        );
    }

    #[test]
    fn read_archive_and_bound() {
        let mut w = RibWriter::new(Vec::new());
        let mut params = CompoundData::new();
        params.insert("name".into(), Data::from("chair.rib"));
        w.emit_command("readArchive", &params).unwrap();
        w.emit_bound(&Aabb::from_min_max(Vec3::splat(-1.0), Vec3::ONE)).unwrap();
        assert_eq!(text(w), "ReadArchive \"chair.rib\"\nBound -1 1 -1 1 -1 1\n");
    }
}
