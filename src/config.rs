// Declarative input for surfaces and the entropy mesh.
//
// Declarations arrive as JSON objects. Validation is strict: any malformed
// field aborts loading with a message naming the shape, the id and the field.

use crate::entropy::{Entropy, Sign};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::surface::{BoundaryType, Surface, SurfaceRegistry};
use crate::vector::Position;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Fields shared by every surface declaration. Shape parameters stay in
/// `params` and are read per shape.
#[derive(Debug, Deserialize)]
struct SurfaceInput {
    #[serde(rename = "type")]
    kind: String,
    id: Option<Value>,
    boundary: Option<String>,
    name: Option<String>,
    #[serde(flatten)]
    params: Map<String, Value>,
}

struct ShapeParams<'a> {
    shape: &'a str,
    id: u32,
    params: &'a Map<String, Value>,
}

impl<'a> ShapeParams<'a> {
    fn context(&self) -> String {
        format!("{} with id {}", self.shape, self.id)
    }

    fn required(&self, field: &str) -> Result<f64> {
        match self.params.get(field) {
            None => Err(Error::config(
                self.context(),
                format!("is missing required {} entry", field),
            )),
            Some(value) => self.number(field, value),
        }
    }

    fn optional(&self, field: &str, default: f64) -> Result<f64> {
        match self.params.get(field) {
            None => Ok(default),
            Some(value) => self.number(field, value),
        }
    }

    fn number(&self, field: &str, value: &Value) -> Result<f64> {
        value.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
            Error::config(
                self.context(),
                format!("has invalid {} entry: {}", field, value),
            )
        })
    }

    fn radius(&self) -> Result<f64> {
        let r = self.required("r")?;
        if r <= 0.0 {
            return Err(Error::config(
                self.context(),
                format!("has non-positive radius {}", r),
            ));
        }
        Ok(r)
    }
}

fn surface_id(shape: &str, id: Option<&Value>) -> Result<u32> {
    let value = id.ok_or_else(|| {
        Error::config(format!("{} declaration", shape), "is missing required id entry")
    })?;
    value
        .as_u64()
        .filter(|&id| id > 0 && id <= u32::MAX as u64)
        .map(|id| id as u32)
        .ok_or_else(|| {
            Error::config(
                format!("{} declaration", shape),
                format!("has invalid id {}; ids must be positive integers", value),
            )
        })
}

/// Build one surface from its declaration.
pub fn surface_from_json(value: &Value) -> Result<Surface> {
    let input: SurfaceInput = serde_json::from_value(value.clone())
        .map_err(|e| Error::config("surface declaration", e.to_string()))?;
    let shape = input.kind.to_lowercase();
    let id = surface_id(&shape, input.id.as_ref())?;

    let boundary = match input.boundary.as_deref() {
        None => BoundaryType::Normal,
        Some(b) => BoundaryType::from_str_option(&b.to_lowercase()).ok_or_else(|| {
            Error::config(
                format!("{} with id {}", shape, id),
                format!("has unknown boundary type {:?}", b),
            )
        })?,
    };

    let p = ShapeParams {
        shape: &shape,
        id,
        params: &input.params,
    };
    let b = Some(boundary);
    let surface = match shape.as_str() {
        "xplane" => Surface::x_plane(p.required("x0")?, id, b),
        "yplane" => Surface::y_plane(p.required("y0")?, id, b),
        "zplane" => Surface::z_plane(p.required("z0")?, id, b),
        "plane" => {
            let (a, bb, c, d) = (
                p.required("a")?,
                p.required("b")?,
                p.required("c")?,
                p.required("d")?,
            );
            Surface::plane(a, bb, c, d, id, b).ok_or_else(|| {
                Error::config(p.context(), "has a zero normal vector (a, b, c)")
            })?
        }
        "sphere" => Surface::sphere(
            p.optional("x0", 0.0)?,
            p.optional("y0", 0.0)?,
            p.optional("z0", 0.0)?,
            p.radius()?,
            id,
            b,
        ),
        "xcylinder" => Surface::x_cylinder(p.required("y0")?, p.required("z0")?, p.radius()?, id, b),
        "ycylinder" => Surface::y_cylinder(p.required("x0")?, p.required("z0")?, p.radius()?, id, b),
        "zcylinder" => Surface::z_cylinder(p.required("x0")?, p.required("y0")?, p.radius()?, id, b),
        other => {
            return Err(Error::config(
                format!("surface with id {}", id),
                format!("has unknown surface type {:?}", other),
            ))
        }
    };

    Ok(surface.with_name(input.name.unwrap_or_default()))
}

/// Build the surface registry from an array of declarations.
pub fn surfaces_from_json(value: &Value) -> Result<SurfaceRegistry> {
    surfaces_from_json_with(value, &Settings::default())
}

/// As `surfaces_from_json`, with the on-surface tolerance taken from `settings`
pub fn surfaces_from_json_with(value: &Value, settings: &Settings) -> Result<SurfaceRegistry> {
    let list = value
        .as_array()
        .ok_or_else(|| Error::config("surfaces", "expected an array of surface declarations"))?;
    let surfaces = list
        .iter()
        .map(|v| surface_from_json(v).map(|s| s.with_tolerance(settings.surface_coincident)))
        .collect::<Result<Vec<_>>>()?;
    SurfaceRegistry::new(surfaces)
}

fn triple(value: &Value, field: &str) -> Result<[f64; 3]> {
    let entries = value
        .get(field)
        .and_then(Value::as_array)
        .filter(|a| a.len() == 3)
        .ok_or_else(|| {
            Error::config(
                "entropy mesh",
                format!("no valid {} entry provided; expected a 3-element array", field),
            )
        })?;
    let mut out = [0.0; 3];
    for (slot, entry) in out.iter_mut().zip(entries) {
        *slot = entry.as_f64().ok_or_else(|| {
            Error::config("entropy mesh", format!("invalid {} entry: {}", field, entry))
        })?;
    }
    Ok(out)
}

/// Build an entropy mesh from `{"low": [..], "hi": [..], "shape": [..], "sign"?: ..}`.
pub fn entropy_from_json(value: &Value) -> Result<Entropy> {
    let low = triple(value, "low")?;
    let hi = triple(value, "hi")?;

    let shape_entries = value
        .get("shape")
        .and_then(Value::as_array)
        .filter(|a| a.len() == 3)
        .ok_or_else(|| {
            Error::config(
                "entropy mesh",
                "no valid shape entry provided; expected a 3-element array",
            )
        })?;
    let mut shape = [0usize; 3];
    for (slot, entry) in shape.iter_mut().zip(shape_entries) {
        *slot = entry
            .as_u64()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                Error::config("entropy mesh", format!("invalid shape entry: {}", entry))
            })? as usize;
    }

    let sign = match value.get("sign") {
        None => Sign::Total,
        Some(s) => Sign::deserialize(s)
            .map_err(|_| Error::config("entropy mesh", format!("invalid sign entry: {}", s)))?,
    };

    Entropy::new(
        Position::new(low[0], low[1], low[2]),
        Position::new(hi[0], hi[1], hi[2]),
        shape,
        sign,
    )
}
