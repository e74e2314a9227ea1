//! Plain-text parameter readout for the host UI.

use fractal::params::fractal_type_label;
use fractal::{Parameter, UniformValue};

use crate::program::UniformTarget;
use crate::registry::ParameterRegistry;

pub const CONTROLS: &str = "\
Controls:
  q, Esc         quit
  c, h, ?        print these controls
  m / j          Mandelbrot / Julia mode (resets parameters)
  + / -          more / fewer iterations
  space          toggle Julia interactive mode
  a t v o        antialiasing, transparency, rainbow, mirrored colours
  p / P          power up / down
  b / B          bailout up / down
  g / G          gamma up / down
  [ / ]          rotate
  0              reset parameters
  arrow keys     move the camera
  scroll wheel   zoom about the cursor
  left drag      pan
  mouse move     change the Julia constant (interactive mode)
";

/// One dump line, e.g. `Max Iterations: 50` or `Julia mode? off`.
fn line(parameter: Parameter, label: &str, value: UniformValue) -> String {
    let value = match (parameter, value) {
        (Parameter::Fractal, UniformValue::Int(index)) => fractal_type_label(index).to_string(),
        (_, value) => value.to_string(),
    };
    if label.ends_with('?') {
        format!("{label} {value}")
    } else {
        format!("{label}: {value}")
    }
}

/// Labelled parameter values read back from `target`, split into a left and
/// a right column. Parameters the program does not declare are left out.
pub fn parameter_dump<T: UniformTarget + ?Sized>(
    registry: &ParameterRegistry,
    target: &mut T,
) -> (String, String) {
    let lines: Vec<String> = registry
        .entries()
        .iter()
        .filter_map(|entry| {
            let label = entry.parameter.label()?;
            let value = registry.get(target, entry.parameter)?;
            Some(line(entry.parameter, label, value))
        })
        .collect();

    let split = lines.len().div_ceil(2);
    let (left, right) = lines.split_at(split);
    (join(left), join(right))
}

fn join(lines: &[String]) -> String {
    lines.iter().fold(String::new(), |mut text, line| {
        text.push_str(line);
        text.push('\n');
        text
    })
}

/// Both columns side by side, padded to the width of the left one.
pub fn side_by_side(left: &str, right: &str) -> String {
    let width = left.lines().map(str::len).max().unwrap_or(0);
    let mut left_lines = left.lines();
    let mut right_lines = right.lines();
    let mut out = String::new();
    loop {
        match (left_lines.next(), right_lines.next()) {
            (None, None) => break,
            (l, r) => {
                let l = l.unwrap_or("");
                let r = r.unwrap_or("");
                out.push_str(format!("{l:<width$}    {r}").trim_end());
                out.push('\n');
            }
        }
    }
    out
}
