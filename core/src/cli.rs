use std::fmt::Write;

use crate::analyze_session::SessionAnalysis;
use crate::geo::RoundTo;
use crate::models::{Direction, Tack};

fn opt_deg(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{:.1}°", x))
}

fn opt_kn(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{:.2} kn", x))
}

/// Plain-text session report.
pub fn render_report(analysis: &SessionAnalysis) -> String {
    let w = &analysis.wind;
    let m = &analysis.metrics;
    let mut out = String::new();

    // writes to a String cannot fail
    let _ = writeln!(out, "--- Session Report ---");
    let _ = writeln!(
        out,
        "Wind: {:.1}° (seed {:.1}°, {} adjustment(s){}), confidence {:?}",
        w.direction,
        w.initial_direction,
        w.iterations,
        if w.converged { "" } else { ", not converged" },
        w.confidence
    );
    let _ = writeln!(
        out,
        "Tack angles: port {} ({} legs), starboard {} ({} legs)",
        opt_deg(w.port_average_angle),
        w.port_segments,
        opt_deg(w.starboard_average_angle),
        w.starboard_segments
    );
    let _ = writeln!(
        out,
        "Segments: {} total, {} active ({} upwind, {} downwind)",
        analysis.segments.len(),
        m.active_segments,
        m.upwind_segments,
        m.downwind_segments
    );
    let _ = writeln!(
        out,
        "Distance: {:.2} km, max speed {:.1} kn",
        (m.total_distance_meters / 1000.0).round_to(2),
        m.max_speed_knots
    );
    let _ = writeln!(out, "Upwind speed (distance-weighted): {:.2} kn", m.avg_upwind_speed_knots);
    let _ = writeln!(
        out,
        "VMG: session {}, representative {}, best {}",
        opt_kn(m.session_vmg_knots),
        opt_kn(m.representative_vmg_knots),
        m.best_vmg.map_or_else(
            || "-".to_string(),
            |b| format!("{:.2} kn @ {:.1}° (#{})", b.vmg_knots, b.angle_to_wind, b.segment_id)
        )
    );
    for (label, best) in [("port", m.best_port), ("starboard", m.best_starboard)] {
        if let Some(b) = best {
            let _ = writeln!(
                out,
                "Best {label} pointing: {:.1}° at {:.1} kn (#{})",
                b.angle_to_wind, b.speed_knots, b.segment_id
            );
        }
    }

    if !m.segments.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  #  active  bearing  angle  dir  tack  speed   vmg");
        for (seg, sm) in analysis.segments.iter().zip(&m.segments) {
            let _ = writeln!(
                out,
                "{:>3}  {:<6}  {:>6.1}°  {:>5.1}°  {:<3}  {:<4}  {:>5.1}  {:>5.2}",
                sm.segment_id,
                if sm.active { "yes" } else { "no" },
                seg.bearing,
                sm.angle_to_wind,
                match sm.direction {
                    Direction::Upwind => "up",
                    Direction::Downwind => "dn",
                },
                match sm.tack {
                    Tack::Port => "P",
                    Tack::Starboard => "S",
                },
                sm.avg_speed_knots,
                sm.vmg_knots
            );
        }
    }
    out
}
