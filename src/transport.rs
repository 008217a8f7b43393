// Transport operators: move a particle from its current position to its
// next real collision, or until it leaks.
//
// All three strategies hold only data built at construction and can be
// shared between threads; per-particle state lives in the particle, the
// tracker and the material helper.

use crate::error::{Error, Result};
use crate::fast_rng::FastRng;
use crate::majorant::Majorant;
use crate::material::{Material, MaterialHelper};
use crate::parallel::Communicator;
use crate::particle::Particle;
use crate::scores::ThreadLocalScores;
use crate::settings::Settings;
use crate::surface::{Boundary, BoundaryType};
use crate::tracker::Tracker;
use crate::utilities::lower_index;

/// Kill a particle at a vacuum boundary and score its leakage and squared
/// migration distance from birth
fn leak(p: &mut Particle, boundary: &Boundary, scores: &mut ThreadLocalScores) {
    p.kill();
    scores.leakage_score += p.wgt;
    let r_leak = p.position + boundary.distance * p.direction;
    let displacement = r_leak - p.r_birth;
    scores.mig_score += p.wgt * displacement.dot(&displacement);
}

fn lost_error(p: &Particle, trkr: &Tracker, detail: String) -> Error {
    Error::LostParticle {
        history_id: p.history_id,
        secondary_id: p.secondary_id,
        previous_r: p.previous_position.into(),
        previous_u: p.previous_direction.into(),
        detail,
        r: (*trkr.r()).into(),
        u: (*trkr.u()).into(),
    }
}

fn reflection_error(p: &Particle, trkr: &Tracker, boundary: &Boundary) -> Error {
    let surface_id = trkr.geometry().surfaces().id_of(boundary.surface_index);
    lost_error(
        p,
        trkr,
        format!(
            "Attempted reflection with surface {} at a distance of {} cm.",
            surface_id, boundary.distance
        ),
    )
}

/// Fly a tentative distance with a copy of the tracker. If the copy stays in
/// the geometry it replaces the tracker and `None` is returned; otherwise the
/// flight crossed a boundary condition, which is found from the start point.
fn try_flight(trkr: &mut Tracker, distance: f64) -> Option<Boundary> {
    if distance.is_finite() {
        let mut probe = trkr.clone();
        probe.move_by(distance);
        probe.get_current();
        if !probe.is_lost() {
            *trkr = probe;
            return None;
        }
    }
    Some(trkr.get_boundary_condition())
}

/// Apply the boundary condition met during a majorant flight
fn majorant_boundary(
    p: &mut Particle,
    trkr: &mut Tracker,
    boundary: &Boundary,
    scores: &mut ThreadLocalScores,
) -> Result<()> {
    match boundary.boundary_type {
        BoundaryType::Vacuum => {
            leak(p, boundary, scores);
            Ok(())
        }
        BoundaryType::Reflective => {
            trkr.do_reflection(p, boundary);
            if trkr.is_lost() {
                return Err(reflection_error(p, trkr, boundary));
            }
            Ok(())
        }
        BoundaryType::Normal => Err(Error::ImpossibleBoundary(format!(
            "particle {}.{} left the geometry through a normal surface during majorant tracking \
             (r = {:?}, u = {:?})",
            p.history_id,
            p.secondary_id,
            p.position.as_slice(),
            p.direction.as_slice()
        ))),
    }
}

/// Tentative collision is real with probability `et / emaj`
pub(crate) fn accept_real_collision(et: f64, emaj: f64, rng: &mut FastRng) -> bool {
    rng.random() < et / emaj
}

/// Delta (Woodcock) tracking against an energy-dependent majorant.
#[derive(Debug, Clone)]
pub struct DeltaTracker {
    majorant: Majorant,
    tolerance: f64,
}

impl DeltaTracker {
    pub fn new(materials: &[Material], settings: &Settings) -> Result<Self> {
        Ok(Self::from_majorant(Majorant::build(materials)?, settings.majorant_tolerance))
    }

    /// Build the majorant for a run. When `settings.majorant_file` is set the
    /// table is also written there, by rank 0 of `comm` only.
    pub fn for_run(materials: &[Material], settings: &Settings, comm: &dyn Communicator) -> Result<Self> {
        let tracker = Self::new(materials, settings)?;
        if let Some(path) = &settings.majorant_file {
            tracker.majorant.write_artifact(comm, path)?;
        }
        Ok(tracker)
    }

    pub fn from_majorant(majorant: Majorant, tolerance: f64) -> Self {
        DeltaTracker { majorant, tolerance }
    }

    pub fn majorant(&self) -> &Majorant {
        &self.majorant
    }

    pub fn transport(
        &self,
        p: &mut Particle,
        trkr: &mut Tracker,
        mat: &mut MaterialHelper,
        scores: &mut ThreadLocalScores,
    ) -> Result<()> {
        let mut had_collision = false;
        while p.is_alive() && !had_collision {
            let emaj = self.majorant.evaluate(p.energy) + mat.Ew(p.energy);
            p.esmp = emaj;
            let d_coll = p.rng.exponential(emaj);

            let boundary = try_flight(trkr, d_coll);

            // Flux-like track-length scores are valid for virtual flights too
            let flight = boundary.map_or(d_coll, |b| d_coll.min(b.distance));
            scores.score_flight(p, flight, mat);

            match boundary {
                Some(b) => majorant_boundary(p, trkr, &b, scores)?,
                None => {
                    p.move_by(d_coll);
                    mat.set_material(trkr.material(), p.energy);
                    let et = mat.Et(p.energy);
                    if et - emaj > self.tolerance {
                        return Err(Error::MajorantExceeded {
                            energy: p.energy,
                            et,
                            emaj,
                        });
                    }
                    had_collision = accept_real_collision(et, emaj, &mut p.rng);
                }
            }

            if p.is_alive() && !had_collision {
                p.set_previous_collision_virtual();
            }
        }
        if had_collision {
            p.set_previous_collision_real();
        }
        Ok(())
    }
}

/// Surface tracking: exact flights between cell boundaries using the true
/// cross section of each cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceTracker;

impl SurfaceTracker {
    pub fn transport(
        &self,
        p: &mut Particle,
        trkr: &mut Tracker,
        mat: &mut MaterialHelper,
        scores: &mut ThreadLocalScores,
    ) -> Result<()> {
        if trkr.is_lost() {
            return Err(lost_error(p, trkr, "No cell contains the particle.".to_string()));
        }

        let mut had_collision = false;
        while p.is_alive() && !had_collision {
            mat.set_material(trkr.material(), p.energy);
            let et = mat.Et(p.energy);
            p.esmp = et;
            let d_coll = p.rng.exponential(et);
            let boundary = trkr.get_nearest_boundary();

            if boundary.distance < d_coll {
                scores.score_flight(p, boundary.distance, mat);
                match boundary.boundary_type {
                    BoundaryType::Vacuum => leak(p, &boundary, scores),
                    BoundaryType::Reflective => {
                        trkr.do_reflection(p, &boundary);
                        if trkr.is_lost() {
                            return Err(reflection_error(p, trkr, &boundary));
                        }
                    }
                    BoundaryType::Normal => {
                        trkr.cross_boundary(&boundary);
                        p.set_position(*trkr.r());
                        if trkr.is_lost() {
                            let surface_id = trkr.geometry().surfaces().id_of(boundary.surface_index);
                            return Err(lost_error(
                                p,
                                trkr,
                                format!(
                                    "Crossed surface {} at a distance of {} cm into no cell.",
                                    surface_id, boundary.distance
                                ),
                            ));
                        }
                    }
                }
            } else if d_coll.is_infinite() {
                return Err(lost_error(
                    p,
                    trkr,
                    "Streaming to infinity through an unbounded void.".to_string(),
                ));
            } else {
                scores.score_flight(p, d_coll, mat);
                p.move_by(d_coll);
                trkr.move_by(d_coll);
                had_collision = true;
            }
        }
        if had_collision {
            p.set_previous_collision_real();
        }
        Ok(())
    }
}

/// Sampling cross section for Carter tracking
#[derive(Debug, Clone)]
enum SamplingXs {
    Tabulated(Majorant),
    /// Constant within each group; `bounds` holds the group edges ascending
    Multigroup { bounds: Vec<f64>, xs: Vec<f64> },
}

impl SamplingXs {
    fn evaluate(&self, energy: f64) -> f64 {
        match self {
            SamplingXs::Tabulated(table) => table.evaluate(energy),
            SamplingXs::Multigroup { bounds, xs } => xs[lower_index(bounds, energy).min(xs.len() - 1)],
        }
    }
}

/// Carter tracking: like delta tracking, but the sampling cross section may
/// undercut the true one. Weights are corrected at every tentative site so
/// the estimate stays unbiased.
#[derive(Debug, Clone)]
pub struct CarterTracker {
    sampling: SamplingXs,
}

impl CarterTracker {
    /// Continuous-energy sampling cross section
    pub fn new(energy: Vec<f64>, xs: Vec<f64>) -> Result<Self> {
        if xs.iter().any(|v| !(*v > 0.0)) {
            return Err(Error::config("carter tracker", "sampling cross sections must be positive"));
        }
        Ok(CarterTracker {
            sampling: SamplingXs::Tabulated(Majorant::from_tables(energy, xs)?),
        })
    }

    /// One sampling cross section per energy group
    pub fn from_multigroup(bounds: Vec<f64>, xs: Vec<f64>) -> Result<Self> {
        if xs.is_empty() || bounds.len() != xs.len() + 1 {
            return Err(Error::config(
                "carter tracker",
                format!(
                    "{} group cross sections need {} energy bounds, got {}",
                    xs.len(),
                    xs.len() + 1,
                    bounds.len()
                ),
            ));
        }
        if bounds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::config("carter tracker", "energy bounds are not strictly increasing"));
        }
        if xs.iter().any(|v| !(*v > 0.0)) {
            return Err(Error::config("carter tracker", "sampling cross sections must be positive"));
        }
        Ok(CarterTracker {
            sampling: SamplingXs::Multigroup { bounds, xs },
        })
    }

    pub fn sampling_xs(&self, energy: f64) -> f64 {
        self.sampling.evaluate(energy)
    }

    pub fn transport(
        &self,
        p: &mut Particle,
        trkr: &mut Tracker,
        mat: &mut MaterialHelper,
        scores: &mut ThreadLocalScores,
    ) -> Result<()> {
        let mut had_collision = false;
        while p.is_alive() && !had_collision {
            let esmp = self.sampling.evaluate(p.energy) + mat.Ew(p.energy);
            p.esmp = esmp;
            let d_coll = p.rng.exponential(esmp);

            match try_flight(trkr, d_coll) {
                Some(b) => majorant_boundary(p, trkr, &b, scores)?,
                None => {
                    p.move_by(d_coll);
                    mat.set_material(trkr.material(), p.energy);
                    let et = mat.Et(p.energy);
                    let p_real = et / (et + (et - esmp).abs());
                    if p.rng.random() < p_real {
                        p.scale_weights(et / (esmp * p_real));
                        had_collision = true;
                    } else {
                        p.scale_weights((1.0 - et / esmp) / (1.0 - p_real));
                    }
                }
            }

            if p.is_alive() && !had_collision {
                p.set_previous_collision_virtual();
            }
        }
        if had_collision {
            p.set_previous_collision_real();
        }
        Ok(())
    }
}

/// The available transport strategies
#[derive(Debug, Clone)]
pub enum TransportOperator {
    Delta(DeltaTracker),
    Surface(SurfaceTracker),
    Carter(CarterTracker),
}

impl TransportOperator {
    pub fn transport(
        &self,
        p: &mut Particle,
        trkr: &mut Tracker,
        mat: &mut MaterialHelper,
        scores: &mut ThreadLocalScores,
    ) -> Result<()> {
        match self {
            TransportOperator::Delta(op) => op.transport(p, trkr, mat, scores),
            TransportOperator::Surface(op) => op.transport(p, trkr, mat, scores),
            TransportOperator::Carter(op) => op.transport(p, trkr, mat, scores),
        }
    }

    /// Safe to combine with exact weight cancellation
    pub fn exact_cancellation_compatible(&self) -> bool {
        match self {
            TransportOperator::Delta(_) | TransportOperator::Carter(_) => true,
            TransportOperator::Surface(_) => false,
        }
    }

    /// Safe to combine with track-length estimators
    pub fn track_length_compatible(&self) -> bool {
        match self {
            TransportOperator::Delta(_) | TransportOperator::Surface(_) => true,
            TransportOperator::Carter(_) => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransportOperator::Delta(_) => "delta tracking",
            TransportOperator::Surface(_) => "surface tracking",
            TransportOperator::Carter(_) => "carter tracking",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::geometry::Geometry;
    use crate::nuclide::Nuclide;
    use crate::parallel::{LocalCommunicator, SerialCommunicator};
    use crate::region::Region;
    use crate::surface::{Surface, SurfaceRegistry};
    use crate::vector::{Direction, Position};
    use std::sync::Arc;

    fn pure_absorber(sigma: f64) -> Vec<Material> {
        let n = Arc::new(
            Nuclide::new("Abs", 1.0, vec![1e-5, 2e7], vec![0.0, 0.0], vec![sigma, sigma]).unwrap(),
        );
        let mut m = Material::new(1);
        m.add_nuclide(n, 1.0).unwrap();
        vec![m]
    }

    /// Sphere of radius 1 filled with material 0, inside a void shell out to
    /// a vacuum sphere of radius `outer`
    fn sphere_geometry(outer_boundary: BoundaryType) -> Geometry {
        let surfaces = SurfaceRegistry::new(vec![
            Surface::sphere(0.0, 0.0, 0.0, 1.0, 1, None),
            Surface::sphere(0.0, 0.0, 0.0, 2.0, 2, Some(outer_boundary)),
        ])
        .unwrap();
        let cells = vec![
            Cell::new(1, Region::below(0), None, Some(0)),
            Cell::new(2, Region::above(0).intersection(&Region::below(1)), None, None),
        ];
        Geometry::new(Arc::new(surfaces), cells).unwrap()
    }

    fn start(history: u64) -> Particle {
        Particle::new(
            Position::zeros(),
            Direction::new(1.0, 0.0, 0.0),
            1.0e6,
            1.0,
            history,
            FastRng::for_history(99, history),
        )
    }

    #[test]
    fn test_capability_flags() {
        let delta = TransportOperator::Delta(DeltaTracker::from_majorant(
            Majorant::from_tables(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap(),
            1e-10,
        ));
        let surface = TransportOperator::Surface(SurfaceTracker);
        let carter = TransportOperator::Carter(CarterTracker::new(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap());
        assert_eq!(
            (delta.exact_cancellation_compatible(), delta.track_length_compatible()),
            (true, true)
        );
        assert_eq!(
            (surface.exact_cancellation_compatible(), surface.track_length_compatible()),
            (false, true)
        );
        assert_eq!(
            (carter.exact_cancellation_compatible(), carter.track_length_compatible()),
            (true, false)
        );
    }

    #[test]
    fn test_acceptance_ratio_converges() {
        let mut rng = FastRng::new(2718);
        let (et, emaj) = (0.3, 1.2);
        let n = 200_000;
        let accepted = (0..n).filter(|_| accept_real_collision(et, emaj, &mut rng)).count();
        let ratio = accepted as f64 / n as f64;
        // 5 sigma of a binomial with p = 0.25
        let sigma = (0.25 * 0.75 / n as f64).sqrt();
        assert!((ratio - 0.25).abs() < 5.0 * sigma, "ratio = {}", ratio);
    }

    /// Uncollided escape probability from the centre of a unit absorbing
    /// sphere is exp(-Σ); every operator must reproduce it.
    fn escape_fraction(op: &TransportOperator, sigma: f64, histories: u64) -> f64 {
        let materials = pure_absorber(sigma);
        let geometry = sphere_geometry(BoundaryType::Vacuum);
        let mut leaked = 0.0;
        for h in 0..histories {
            let mut p = start(h);
            let u = crate::physics::isotropic_direction(&mut p.rng);
            p.set_direction(u);
            let mut trkr = Tracker::new(&geometry, p.position, p.direction);
            let mut mat = MaterialHelper::new(&materials, None);
            mat.set_material(trkr.material(), p.energy);
            let mut scores = ThreadLocalScores::new(false);
            op.transport(&mut p, &mut trkr, &mut mat, &mut scores).unwrap();
            leaked += scores.leakage_score;
            if p.is_alive() {
                assert!(trkr.material() == Some(0));
            }
        }
        leaked / histories as f64
    }

    #[test]
    fn test_delta_and_surface_escape_probability() {
        let sigma: f64 = 1.5;
        let expected = (-sigma).exp();
        let delta = TransportOperator::Delta(DeltaTracker::new(&pure_absorber(sigma), &Settings::default()).unwrap());
        let surface = TransportOperator::Surface(SurfaceTracker);
        for op in [&delta, &surface] {
            let f = escape_fraction(op, sigma, 40_000);
            assert!((f - expected).abs() < 0.01, "{}: {} vs {}", op.name(), f, expected);
        }
    }

    #[test]
    fn test_carter_escape_weight_is_unbiased() {
        // Sampling xs below the true one forces negative weight corrections
        let sigma: f64 = 1.5;
        let expected = (-sigma).exp();
        let carter = TransportOperator::Carter(CarterTracker::new(vec![1e-5, 2e7], vec![1.2, 1.2]).unwrap());
        let f = escape_fraction(&carter, sigma, 80_000);
        assert!((f - expected).abs() < 0.01, "carter: {} vs {}", f, expected);
    }

    #[test]
    fn test_majorant_violation_is_fatal() {
        let materials = pure_absorber(2.0);
        let geometry = sphere_geometry(BoundaryType::Vacuum);
        let delta = DeltaTracker::from_majorant(
            Majorant::from_tables(vec![1e-5, 2e7], vec![1.0, 1.0]).unwrap(),
            1e-10,
        );
        // Flights shorter than the unit radius end inside the material
        let mut result = Ok(());
        for h in 0..100 {
            let mut p = start(h);
            let mut trkr = Tracker::new(&geometry, p.position, p.direction);
            let mut mat = MaterialHelper::new(&materials, None);
            let mut scores = ThreadLocalScores::new(false);
            result = delta.transport(&mut p, &mut trkr, &mut mat, &mut scores);
            if result.is_err() {
                break;
            }
        }
        match result {
            Err(Error::MajorantExceeded { et, emaj, .. }) => {
                assert_eq!(et, 2.0);
                assert_eq!(emaj, 1.0);
            }
            other => panic!("expected majorant error, got {:?}", other),
        }
    }

    #[test]
    fn test_reflective_sphere_never_leaks() {
        let materials = pure_absorber(0.2);
        let geometry = sphere_geometry(BoundaryType::Reflective);
        let delta = DeltaTracker::new(&materials, &Settings::default()).unwrap();
        for h in 0..200 {
            let mut p = start(h);
            let mut trkr = Tracker::new(&geometry, p.position, p.direction);
            let mut mat = MaterialHelper::new(&materials, None);
            let mut scores = ThreadLocalScores::new(true);
            delta.transport(&mut p, &mut trkr, &mut mat, &mut scores).unwrap();
            assert!(p.is_alive());
            assert_eq!(scores.leakage_score, 0.0);
            assert!(p.position.norm() <= 1.0 + 1e-9);
            assert!(scores.flux_real > 0.0);
        }
    }

    #[test]
    fn test_leak_scores_migration() {
        let materials = pure_absorber(1e-12);
        let geometry = sphere_geometry(BoundaryType::Vacuum);
        let mut p = start(1);
        let mut trkr = Tracker::new(&geometry, p.position, p.direction);
        let mut mat = MaterialHelper::new(&materials, None);
        let mut scores = ThreadLocalScores::new(false);
        SurfaceTracker
            .transport(&mut p, &mut trkr, &mut mat, &mut scores)
            .unwrap();
        assert!(!p.is_alive());
        assert_eq!(scores.leakage_score, 1.0);
        assert!((scores.mig_score - 4.0).abs() < 1e-9);
    }

    /// Unit sphere of material 0 and nothing outside it
    fn bare_sphere() -> Geometry {
        let surfaces = SurfaceRegistry::new(vec![Surface::sphere(0.0, 0.0, 0.0, 1.0, 4, None)]).unwrap();
        Geometry::new(Arc::new(surfaces), vec![Cell::new(1, Region::below(0), None, Some(0))]).unwrap()
    }

    fn run(op: &TransportOperator, geometry: &Geometry, materials: &[Material], mut p: Particle) -> Result<()> {
        let mut trkr = Tracker::new(geometry, p.position, p.direction);
        let mut mat = MaterialHelper::new(materials, None);
        mat.set_material(trkr.material(), p.energy);
        let mut scores = ThreadLocalScores::new(false);
        op.transport(&mut p, &mut trkr, &mut mat, &mut scores)
    }

    #[test]
    fn test_majorant_flight_through_normal_surface_is_impossible() {
        let materials = pure_absorber(1e-9);
        let geometry = bare_sphere();
        let ops = [
            TransportOperator::Delta(DeltaTracker::new(&materials, &Settings::default()).unwrap()),
            TransportOperator::Carter(CarterTracker::new(vec![1e-5, 2e7], vec![1e-9, 1e-9]).unwrap()),
        ];
        for op in &ops {
            match run(op, &geometry, &materials, start(17)) {
                Err(Error::ImpossibleBoundary(message)) => {
                    assert!(message.contains("particle 17.0"), "{}", message);
                }
                other => panic!("{}: expected an impossible boundary, got {:?}", op.name(), other),
            }
        }
    }

    #[test]
    fn test_reflection_into_no_cell_is_fatal() {
        let surfaces = SurfaceRegistry::new(vec![
            Surface::sphere(0.0, 0.0, 0.0, 1.0, 4, None),
            Surface::x_plane(0.5, 9, Some(BoundaryType::Reflective)),
        ])
        .unwrap();
        let cell = Cell::new(1, Region::below(0).intersection(&Region::below(1)), None, Some(0));
        let geometry = Geometry::new(Arc::new(surfaces), vec![cell]).unwrap();

        let mut p = start(3);
        let mut trkr = Tracker::new(&geometry, p.position, p.direction);
        let mut scores = ThreadLocalScores::new(false);
        // A boundary reported past the plane reflects the particle outside
        // the sphere, where there is no cell
        let boundary = Boundary::new(2.0, Some(1), BoundaryType::Reflective);
        match majorant_boundary(&mut p, &mut trkr, &boundary, &mut scores) {
            Err(Error::LostParticle { history_id, secondary_id, detail, .. }) => {
                assert_eq!((history_id, secondary_id), (3, 0));
                assert!(detail.contains("surface 9"), "{}", detail);
            }
            other => panic!("expected a lost particle, got {:?}", other),
        }
        assert!(trkr.is_lost());
    }

    #[test]
    fn test_surface_crossing_into_no_cell_is_fatal() {
        let materials = pure_absorber(1e-12);
        let err = run(&TransportOperator::Surface(SurfaceTracker), &bare_sphere(), &materials, start(5)).unwrap_err();
        match &err {
            Error::LostParticle { history_id, detail, r, .. } => {
                assert_eq!(*history_id, 5);
                assert!(detail.contains("surface 4"), "{}", detail);
                assert!((r[0] - 1.0).abs() < 1e-9);
            }
            other => panic!("expected a lost particle, got {:?}", other),
        }
        assert!(err.to_string().contains("Particle 5.0"));
    }

    #[test]
    fn test_streaming_to_infinity_is_fatal() {
        // Void half-space x > 0 with nothing ahead of the particle
        let surfaces = SurfaceRegistry::new(vec![Surface::x_plane(0.0, 2, None)]).unwrap();
        let geometry = Geometry::new(Arc::new(surfaces), vec![Cell::new(1, Region::above(0), None, None)]).unwrap();
        let materials = pure_absorber(1.0);
        let mut p = start(8);
        p.set_position(Position::new(1.0, 0.0, 0.0));

        match run(&TransportOperator::Surface(SurfaceTracker), &geometry, &materials, p.clone()) {
            Err(Error::LostParticle { history_id, detail, .. }) => {
                assert_eq!(history_id, 8);
                assert!(detail.contains("infinity"), "{}", detail);
            }
            other => panic!("expected a lost particle, got {:?}", other),
        }

        // An infinite majorant flight along the same ray finds no boundary
        // condition either
        let delta = TransportOperator::Delta(DeltaTracker::from_majorant(
            Majorant::from_tables(vec![1e-5, 2e7], vec![0.0, 0.0]).unwrap(),
            1e-10,
        ));
        match run(&delta, &geometry, &materials, p) {
            Err(Error::ImpossibleBoundary(message)) => assert!(message.contains("particle 8.0"), "{}", message),
            other => panic!("expected an impossible boundary, got {:?}", other),
        }
    }

    #[test]
    fn test_delta_mean_free_path_under_loose_majorant() {
        // Et = 0.5 under Emaj = 2: three virtual collisions per real one
        let materials = pure_absorber(0.5);
        let surfaces =
            SurfaceRegistry::new(vec![Surface::sphere(0.0, 0.0, 0.0, 1.0e6, 1, Some(BoundaryType::Reflective))]).unwrap();
        let geometry = Geometry::new(Arc::new(surfaces), vec![Cell::new(1, Region::below(0), None, Some(0))]).unwrap();
        let delta = DeltaTracker::from_majorant(Majorant::from_tables(vec![1e-5, 2e7], vec![2.0, 2.0]).unwrap(), 1e-10);

        let n = 40_000;
        let mut total = 0.0;
        for h in 0..n {
            let mut p = start(h);
            let mut trkr = Tracker::new(&geometry, p.position, p.direction);
            let mut mat = MaterialHelper::new(&materials, None);
            let mut scores = ThreadLocalScores::new(false);
            delta.transport(&mut p, &mut trkr, &mut mat, &mut scores).unwrap();
            assert!(p.is_alive());
            assert!(!p.previous_collision_virtual);
            assert_eq!(p.esmp, 2.0);
            assert!((trkr.r() - p.position).norm() < 1e-9);
            total += p.position.norm();
        }
        // Exponential with mean 2 has standard deviation 2
        let mean = total / n as f64;
        let sigma = 2.0 / (n as f64).sqrt();
        assert!((mean - 2.0).abs() < 5.0 * sigma, "mean free path = {}", mean);
    }

    #[test]
    fn test_virtual_flag_survives_leak() {
        // Almost every tentative collision is virtual before the particle leaks
        let materials = pure_absorber(1e-9);
        let geometry = sphere_geometry(BoundaryType::Vacuum);
        let delta = DeltaTracker::from_majorant(Majorant::from_tables(vec![1e-5, 2e7], vec![20.0, 20.0]).unwrap(), 1e-10);
        let mut p = start(21);
        assert!(!p.previous_collision_virtual);
        let mut trkr = Tracker::new(&geometry, p.position, p.direction);
        let mut mat = MaterialHelper::new(&materials, None);
        let mut scores = ThreadLocalScores::new(false);
        delta.transport(&mut p, &mut trkr, &mut mat, &mut scores).unwrap();
        assert!(!p.is_alive());
        assert!(p.previous_collision_virtual);
        assert_eq!(scores.leakage_score, 1.0);
    }

    #[test]
    fn test_majorant_file_written_by_root_rank() {
        let materials = pure_absorber(0.7);
        let dir = std::env::temp_dir();
        let mut settings = Settings::default();

        let root_path = dir.join(format!("delta-majorant-{}.json", std::process::id()));
        settings.majorant_file = Some(root_path.clone());
        let delta = DeltaTracker::for_run(&materials, &settings, &SerialCommunicator).unwrap();
        let rows: Vec<Vec<f64>> = serde_json::from_str(&std::fs::read_to_string(&root_path).unwrap()).unwrap();
        assert_eq!(rows[0], delta.majorant().energy_grid());
        assert_eq!(rows[1], delta.majorant().values());
        std::fs::remove_file(&root_path).unwrap();

        let other_path = dir.join(format!("delta-majorant-rank1-{}.json", std::process::id()));
        settings.majorant_file = Some(other_path.clone());
        let rank1 = LocalCommunicator::group(2).pop().unwrap();
        DeltaTracker::for_run(&materials, &settings, &rank1).unwrap();
        assert!(!other_path.exists());
    }
}
