//! Railway Track Demo.
//!
//! Baut ein kleines Gleisnetz mit einer Weiche, fährt eine Position darüber
//! und gibt die durchfahrenen Punkte aus.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use railway_track_engine::{
    DataStore, Gauge, NodeId, Railway, RailwayOptions, SectionId, TrackPosition,
};

/// Schrittweite der Demo-Fahrt (m).
const DRIVE_STEP: f32 = 25.0;

fn main() -> anyhow::Result<()> {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Railway Track Demo v{} startet...", env!("CARGO_PKG_VERSION"));

    let config_path = RailwayOptions::config_path();
    let options = RailwayOptions::load_from_file(&config_path);
    let gauge = load_gauge(&options);

    let mut railway = Railway::new(options.solver.clone(), options.track_spec.clone());
    let layout = build_layout(&mut railway)?;
    log::info!(
        "Gleisnetz: {} Nodes, {} Abschnitte",
        railway.node_count(),
        railway.section_count()
    );

    for id in layout.sections {
        if let Some(section) = railway.section(id) {
            let points = section.sample(0, options.sample_step);
            log::info!(
                "Abschnitt {}: Länge {:.2} m, {} Segmente, {} Polylinienpunkte",
                id,
                section.length(0).unwrap_or(0.0),
                section.clothoids().len(),
                points.len()
            );
        }
    }

    drive(&railway, layout.origin, gauge.as_deref());

    log::info!("Weiche an {} umstellen", layout.points);
    railway.switch_points(layout.points, 0, true);
    drive(&railway, layout.origin, gauge.as_deref());

    if let Some(hit) = railway.find_closest_node(Vec2::new(99.0, 1.0), options.snap_radius) {
        log::info!("Nächster Node bei (99, 1): {}", hit);
    }
    Ok(())
}

struct Layout {
    origin: NodeId,
    points: NodeId,
    sections: Vec<SectionId>,
}

/// Gerade Zufahrt, danach eine Weiche mit geradem und abzweigendem Strang.
fn build_layout(railway: &mut Railway) -> anyhow::Result<Layout> {
    let origin = railway.add_node(Vec3::ZERO, 0.0, 0.0, 1);
    let points = railway.add_node(Vec3::new(100.0, 0.0, 0.0), 0.0, 0.0, 1);
    let straight = railway.add_node(Vec3::new(200.0, 0.0, 1.0), 0.0, 0.0, 1);
    let branch = railway.add_node(Vec3::new(190.0, 40.0, 0.0), 0.6, 0.0, 1);

    let mut sections = Vec::new();
    for (from, to) in [(origin, points), (points, straight), (points, branch)] {
        let start = railway
            .node(from)
            .map(|node| node.forward())
            .ok_or_else(|| anyhow::anyhow!("Node {from} fehlt"))?;
        let end = railway
            .node(to)
            .map(|node| node.backward())
            .ok_or_else(|| anyhow::anyhow!("Node {to} fehlt"))?;
        let id = railway
            .add_section(start, end)
            .ok_or_else(|| anyhow::anyhow!("Abschnitt {from} -> {to} nicht anschließbar"))?;
        sections.push(id);
    }

    Ok(Layout {
        origin,
        points,
        sections,
    })
}

fn load_gauge(options: &RailwayOptions) -> Option<Arc<Gauge>> {
    let dir = options.data_dir.as_ref()?;
    let mut store = DataStore::new(dir);
    match store.gauge_for(&options.track_spec) {
        Ok(gauge) => gauge,
        Err(e) => {
            log::warn!("Spurweite nicht geladen: {:#}", e);
            None
        }
    }
}

fn drive(railway: &Railway, origin: NodeId, gauge: Option<&Gauge>) {
    let mut position = TrackPosition::at_node(railway, origin, true, 0);
    if !position.is_valid() {
        log::warn!("Kein Abschnitt an {}", origin);
        return;
    }

    loop {
        if let (Some(p), Some(direction)) = (position.position(railway), position.direction(railway)) {
            log::info!(
                "  {:?} d={:.1}: ({:.2}, {:.2}, {:.2}) Richtung {:.3}",
                position.section(),
                position.distance(),
                p.x,
                p.y,
                p.z,
                direction
            );
        }
        if let (Some(gauge), Some(section)) = (gauge, position.section().and_then(|id| railway.section(id))) {
            let rails = gauge.rail_points(section, position.track(), position.distance());
            log::debug!("  Schienen: {:?}", rails);
        }
        if position.at_end(railway, true) {
            break;
        }
        position.advance(railway, DRIVE_STEP);
    }

    let ahead = TrackPosition::at_node(railway, origin, true, 0).distance_to_end(railway, true, None);
    log::info!(
        "Fahrt beendet an {:?}, Strecke bis Ende ab Start: {:.2} m",
        ahead.node,
        ahead.distance
    );
}
