//! Easing curves
//!
//! Maps linear animation progress in `[0, 1]` onto eased progress. Curves are
//! parsed from the strings documents use: `linear`, `ease`, `ease-in`,
//! `ease-out`, `ease-in-out`, `cubic-bezier(x1, y1, x2, y2)` and
//! `steps(n[, start|end])`.

use crate::error::EasingError;
use std::fmt;
use std::str::FromStr;

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 32;
const SOLVE_EPSILON: f32 = 1e-6;

/// Where the jump of a step curve happens within each interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepPosition {
    Start,
    #[default]
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    CubicBezier {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Steps {
        count: u32,
        position: StepPosition,
    },
}

impl Easing {
    /// Eased progress for linear progress `t`. `t` is clamped to `[0, 1]`.
    pub fn calc(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match *self {
            Easing::Linear => t,
            Easing::Steps { count, position } => steps(t, count, position),
            _ => match self.control_points() {
                Some((x1, y1, x2, y2)) => cubic_bezier(t, x1, y1, x2, y2),
                None => t,
            },
        }
    }

    fn control_points(&self) -> Option<(f32, f32, f32, f32)> {
        match *self {
            Easing::Ease => Some((0.25, 0.1, 0.25, 1.0)),
            Easing::EaseIn => Some((0.42, 0.0, 1.0, 1.0)),
            Easing::EaseOut => Some((0.0, 0.0, 0.58, 1.0)),
            Easing::EaseInOut => Some((0.42, 0.0, 0.58, 1.0)),
            Easing::CubicBezier { x1, y1, x2, y2 } => Some((x1, y1, x2, y2)),
            Easing::Linear | Easing::Steps { .. } => None,
        }
    }
}

fn bezier(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_slope(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Solve x(s) = t for the curve parameter, then evaluate y(s).
fn cubic_bezier(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let mut s = t;
    for _ in 0..NEWTON_ITERATIONS {
        let err = bezier(s, x1, x2) - t;
        if err.abs() < SOLVE_EPSILON {
            return bezier(s, y1, y2);
        }
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < SOLVE_EPSILON {
            break;
        }
        s -= err / slope;
    }

    // x(s) is monotonic for x1, x2 in [0, 1], so bisection always converges.
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = t;
    for _ in 0..BISECTION_ITERATIONS {
        let x = bezier(s, x1, x2);
        if (x - t).abs() < SOLVE_EPSILON {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    bezier(s, y1, y2)
}

fn steps(t: f32, count: u32, position: StepPosition) -> f32 {
    if t >= 1.0 {
        return 1.0;
    }
    let n = count.max(1) as f32;
    let step = match position {
        StepPosition::End => (t * n).floor(),
        StepPosition::Start => (t * n).floor() + 1.0,
    };
    (step / n).min(1.0)
}

/// Split `name(a, b, ...)` into its arguments.
fn function_args<'a>(s: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let rest = s.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}

impl FromStr for Easing {
    type Err = EasingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "linear" => return Ok(Easing::Linear),
            "ease" => return Ok(Easing::Ease),
            "ease-in" => return Ok(Easing::EaseIn),
            "ease-out" => return Ok(Easing::EaseOut),
            "ease-in-out" => return Ok(Easing::EaseInOut),
            _ => {}
        }

        if let Some(args) = function_args(s, "cubic-bezier") {
            let values: Vec<f32> = args
                .iter()
                .map(|a| a.parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|_| EasingError::InvalidBezier(s.to_string()))?;
            let [x1, y1, x2, y2] = values[..] else {
                return Err(EasingError::InvalidBezier(s.to_string()));
            };
            let in_range = |x: f32| (0.0..=1.0).contains(&x);
            if !in_range(x1) || !in_range(x2) || !y1.is_finite() || !y2.is_finite() {
                return Err(EasingError::InvalidBezier(s.to_string()));
            }
            return Ok(Easing::CubicBezier { x1, y1, x2, y2 });
        }

        if let Some(args) = function_args(s, "steps") {
            let invalid = || EasingError::InvalidSteps(s.to_string());
            let count = args
                .first()
                .and_then(|a| a.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .ok_or_else(invalid)?;
            let position = match args.get(1).copied() {
                None | Some("end") => StepPosition::End,
                Some("start") => StepPosition::Start,
                Some(_) => return Err(invalid()),
            };
            if args.len() > 2 {
                return Err(invalid());
            }
            return Ok(Easing::Steps { count, position });
        }

        Err(EasingError::UnknownCurve(s.to_string()))
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::Ease => f.write_str("ease"),
            Easing::EaseIn => f.write_str("ease-in"),
            Easing::EaseOut => f.write_str("ease-out"),
            Easing::EaseInOut => f.write_str("ease-in-out"),
            Easing::CubicBezier { x1, y1, x2, y2 } => {
                write!(f, "cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
            Easing::Steps { count, position } => {
                let pos = match position {
                    StepPosition::Start => "start",
                    StepPosition::End => "end",
                };
                write!(f, "steps({}, {})", count, pos)
            }
        }
    }
}
