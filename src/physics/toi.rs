//! Binary-search time-of-impact solver.
//!
//! Given two shapes at a known overlap state and their per-substep
//! displacement vectors, [`approach_test`] bisects a step-size multiplier
//! until it brackets the point where the overlap state flips, then leaves
//! the shapes at the boundary configuration. Searching forward along the
//! motion of a separated pair finds first contact (tunneling capture);
//! searching backward from a penetrating pair finds the push-out needed to
//! separate it.

use glam::Vec2;

use super::hitbox::Hitbox;

/// Step multiplier below which a probe past the flip boundary terminates
/// the search.
pub const SUCCESS_ACCURACY: f32 = 1.0 / 32.0;
/// Step multiplier below which a probe on the seed side gives up, rolling
/// back to the last boundary-side configuration.
pub const FAILURE_ACCURACY: f32 = 1.0 / 64.0;

/// Outcome of one [`approach_test`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachResult {
    /// Net displacement applied to the subject, relative to the position it
    /// was handed in at.
    pub correction: Vec2,
    /// Net step multiplier at termination.
    pub fraction: f32,
    /// Whether the terminal configuration lies past the state flip (an
    /// overlap was found when searching from separation, or vice versa).
    pub hit: bool,
    /// False when the iteration cap cut the search short.
    pub converged: bool,
}

fn overlapped(a: &Hitbox, b: &Hitbox) -> bool {
    a.rough_collides(b) && a.collides_with(b)
}

/// Bisect the displacement fraction at which the overlap state of the pair
/// flips, mutating both hitboxes toward the boundary configuration.
///
/// The initial overlap state seeds the search direction: whatever state the
/// pair starts in counts as "failure", and the flipped state as "success".
/// Each iteration advances both shapes by `move * step`, then halves the
/// step, reversing its sign whenever the probe result changed. Failed
/// probes accumulate into a rollback sum so the search can give up onto the
/// last successful configuration.
///
/// The loop always terminates: the step halves every iteration and the
/// accuracy thresholds are strictly positive, with `max_iterations` as the
/// defensive cap on top. On a cap exit the best available configuration is
/// kept and `converged` is false; the caller decides how to report it.
///
/// Pure with respect to its inputs: rerunning on identical shape states and
/// displacements yields an identical result.
pub fn approach_test(
    subject: &mut Hitbox,
    object: &mut Hitbox,
    subject_move: Vec2,
    object_move: Vec2,
    max_iterations: u32,
) -> ApproachResult {
    let origin = subject.trans().position;
    let seed = overlapped(subject, object);

    let mut step = 0.5f32;
    let mut last = seed;
    let mut fraction = 0.0f32;
    let mut failed_sum = 0.0f32;
    let mut hit_any = false;
    let mut converged = false;

    for _ in 0..max_iterations {
        subject.translate(subject_move * step);
        object.translate(object_move * step);
        fraction += step;

        let state = overlapped(subject, object);
        if state != seed {
            hit_any = true;
            if step.abs() < SUCCESS_ACCURACY {
                converged = true;
                failed_sum = 0.0;
                break;
            }
            failed_sum = 0.0;
        } else {
            if step.abs() < FAILURE_ACCURACY {
                converged = true;
                break;
            }
            failed_sum -= step;
        }

        step *= 0.5;
        if state != last {
            step = -step;
        }
        last = state;
    }

    // Undo any trailing failed probes so the terminal configuration is the
    // last one found past the boundary (or the start, if none was).
    if failed_sum != 0.0 {
        subject.translate(subject_move * failed_sum);
        object.translate(object_move * failed_sum);
        fraction += failed_sum;
    }

    ApproachResult {
        correction: subject.trans().position - origin,
        fraction,
        hit: hit_any,
        converged,
    }
}
