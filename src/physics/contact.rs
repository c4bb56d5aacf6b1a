//! Contact data and per-entity manifold construction.

use glam::Vec2;

use super::hitbox::Hitbox;
use super::narrowphase::sweep_threshold;
use super::toi::approach_test;
use super::PhysicsConfig;

/// One overlapping shape-component pair, recorded during the detect phase
/// into the subject entity's accumulation buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawContact {
    pub other: hecs::Entity,
    pub subject_component: usize,
    pub object_component: usize,
    pub point: Vec2,
    pub normal: Vec2,
    /// Present on swept (tunneling) contacts: the displacement that pulls
    /// the subject back onto the impact configuration.
    pub correction: Option<Vec2>,
}

/// A single contact kept on a manifold entry.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    pub point: Vec2,
    pub normal: Vec2,
    pub subject_component: usize,
    pub object_component: usize,
}

/// Aggregated contact data against one partner entity for one substep.
#[derive(Debug, Clone)]
pub struct ManifoldEntry {
    pub other: hecs::Entity,
    pub points: Vec<ContactPoint>,
    /// Centroid of the gathered intersection points.
    pub position: Vec2,
    /// Normalized average of the gathered contact normals, pointing from
    /// the partner toward this entity.
    pub normal: Vec2,
    /// Positional correction owed to this partner.
    pub correction: Vec2,
}

/// Per-entity collision slot, rebuilt every substep.
///
/// `last_partners` survives the rebuild: it carries the previous substep's
/// entry keys so resting contacts can skip the time-of-impact search.
#[derive(Debug, Default)]
pub struct Manifold {
    pub entries: Vec<ManifoldEntry>,
    pub(crate) raw: Vec<RawContact>,
    pub(crate) last_partners: Vec<hecs::Entity>,
}

impl Manifold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_colliding(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn entry_for(&self, other: hecs::Entity) -> Option<&ManifoldEntry> {
        self.entries.iter().find(|entry| entry.other == other)
    }

    pub fn was_colliding_with(&self, other: hecs::Entity) -> bool {
        self.last_partners.contains(&other)
    }

    /// Raw detect-phase contacts behind the current entries.
    pub fn raw_contacts(&self) -> &[RawContact] {
        &self.raw
    }

    pub(crate) fn commit_partners(&mut self) {
        self.last_partners.clear();
        self.last_partners.extend(self.entries.iter().map(|e| e.other));
    }
}

/// Build every entity's manifold from the detect phase output (stage 3).
///
/// Groups the raw contacts by partner, so each pair keeps exactly one entry
/// however many component pairs intersected. Swept contacts carry their
/// correction from the detect phase; an endpoint contact against a fast
/// partner that was not resting last substep gets a backward separation
/// search; everything else keeps a zero correction and responds from the
/// overlap centroid alone.
///
/// Returns (toi invocations, toi cap hits) for the step stats.
pub(crate) fn build_manifolds(
    world: &mut hecs::World,
    results: Vec<(hecs::Entity, Vec<RawContact>)>,
    config: &PhysicsConfig,
    substeps: u32,
) -> (u32, u32) {
    let mut toi_invocations = 0u32;
    let mut toi_cap_hits = 0u32;

    for (entity, raw) in results {
        let Ok(subject_hitbox) = world.get::<&Hitbox>(entity).map(|h| (*h).clone()) else {
            continue;
        };
        let last_partners = match world.get::<&Manifold>(entity) {
            Ok(manifold) => manifold.last_partners.clone(),
            Err(_) => continue,
        };

        let mut entries: Vec<ManifoldEntry> = Vec::new();
        for contact in &raw {
            if let Some(entry) = entries.iter_mut().find(|e| e.other == contact.other) {
                entry.points.push(point_of(contact));
                if let Some(correction) = contact.correction {
                    entry.correction = correction;
                }
                continue;
            }

            let correction = match contact.correction {
                Some(correction) => correction,
                None => {
                    let resting = last_partners.contains(&contact.other);
                    if resting {
                        Vec2::ZERO
                    } else {
                        let (correction, ran, capped) = separation_correction(
                            world,
                            &subject_hitbox,
                            contact.other,
                            config,
                            substeps,
                        );
                        toi_invocations += u32::from(ran);
                        toi_cap_hits += u32::from(capped);
                        correction
                    }
                }
            };

            entries.push(ManifoldEntry {
                other: contact.other,
                points: vec![point_of(contact)],
                position: Vec2::ZERO,
                normal: Vec2::ZERO,
                correction,
            });
        }

        for entry in &mut entries {
            let inv = 1.0 / entry.points.len() as f32;
            entry.position = entry.points.iter().map(|p| p.point).sum::<Vec2>() * inv;
            let normal_sum: Vec2 = entry.points.iter().map(|p| p.normal).sum();
            entry.normal = normal_sum.normalize_or(entry.points[0].normal);
        }

        if let Ok(mut manifold) = world.get::<&mut Manifold>(entity) {
            manifold.raw = raw;
            manifold.entries = entries;
        }
    }

    (toi_invocations, toi_cap_hits)
}

fn point_of(contact: &RawContact) -> ContactPoint {
    ContactPoint {
        point: contact.point,
        normal: contact.normal,
        subject_component: contact.subject_component,
        object_component: contact.object_component,
    }
}

/// Backward time-of-impact search for a freshly penetrating fast pair:
/// walks both shapes back along their motion until they separate and
/// returns the net displacement as the subject's correction.
fn separation_correction(
    world: &hecs::World,
    subject_hitbox: &Hitbox,
    other: hecs::Entity,
    config: &PhysicsConfig,
    substeps: u32,
) -> (Vec2, bool, bool) {
    let Ok(object_hitbox) = world.get::<&Hitbox>(other).map(|h| (*h).clone()) else {
        return (Vec2::ZERO, false, false);
    };

    let subject_move = subject_hitbox.back_trace_unit_move(substeps);
    let object_move = object_hitbox.back_trace_unit_move(substeps);
    let rel_move = subject_move - object_move;
    if rel_move.length() < sweep_threshold(subject_hitbox, &object_hitbox, config) {
        return (Vec2::ZERO, false, false);
    }

    let mut subject = subject_hitbox.clone();
    let mut object = object_hitbox;
    let result = approach_test(
        &mut subject,
        &mut object,
        -subject_move,
        -object_move,
        config.max_toi_iterations,
    );
    if !result.converged {
        tracing::warn!(
            object = ?other,
            "separation search hit its iteration cap"
        );
    }
    let correction = if result.hit { result.correction } else { Vec2::ZERO };
    (correction, true, !result.converged)
}
