//! One ratatui `Chart` per display group, stacked vertically.

use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition};

use super::style::Theme;
use crate::fmt::format_si;
use crate::runtime::{GroupSeries, Series};

/// Draws every group into the frame, splitting the height evenly.
pub fn draw_groups(frame: &mut Frame, groups: &[GroupSeries]) {
    if groups.is_empty() {
        return;
    }
    let constraints = vec![Constraint::Ratio(1, groups.len() as u32); groups.len()];
    let areas = Layout::vertical(constraints).split(frame.area());
    for (group, area) in groups.iter().zip(areas.iter()) {
        draw_group(frame, *area, group);
    }
}

fn draw_group(frame: &mut Frame, area: Rect, group: &GroupSeries) {
    let (x_min, x_max) = x_bounds(group);
    let (y_min, y_max) = y_bounds(group);

    let plots = plots(group, y_min, y_max);
    let datasets: Vec<Dataset> = plots
        .iter()
        .map(|plot| {
            let dataset = Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(plot.style)
                .data(&plot.data);
            match &plot.name {
                Some(name) => dataset.name(name.clone()),
                None => dataset,
            }
        })
        .collect();

    let x_labels = [x_min, (x_min + x_max) / 2.0, x_max]
        .into_iter()
        .map(|x| Span::raw(clock_label(x)))
        .collect::<Vec<_>>();
    let y_labels = [y_min, (y_min + y_max) / 2.0, y_max]
        .into_iter()
        .map(|y| Span::raw(format_si(y)))
        .collect::<Vec<_>>();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        )
        .legend_position(Some(LegendPosition::TopLeft))
        .hidden_legend_constraints((Constraint::Ratio(1, 1), Constraint::Ratio(1, 1)))
        .x_axis(
            Axis::default()
                .style(Theme::axis())
                .bounds([x_min, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Theme::axis())
                .bounds([y_min, y_max])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

/// One dataset to draw. Only named plots show up in the legend.
struct Plot {
    name: Option<String>,
    style: Style,
    data: Vec<(f64, f64)>,
}

/// Lines keep their points. Every marker position becomes its own vertical
/// segment spanning the full y range. Segment ends must lie within the axis
/// bounds or the chart skips the segment entirely.
fn plots(group: &GroupSeries, y_min: f64, y_max: f64) -> Vec<Plot> {
    let mut plots = Vec::new();
    let mut line_index = 0;

    for series in &group.series {
        match series {
            Series::Line { label, points, .. } => {
                plots.push(Plot {
                    name: Some(label.clone()),
                    style: Theme::series(line_index),
                    data: points
                        .iter()
                        .map(|p| (seconds(&p.timestamp), p.value))
                        .collect(),
                });
                line_index += 1;
            }
            Series::Marker { name, positions } => {
                plots.push(Plot {
                    name: Some(name.clone()),
                    style: Theme::marker(),
                    data: Vec::new(),
                });
                plots.extend(positions.iter().map(|t| Plot {
                    name: None,
                    style: Theme::marker(),
                    data: vec![(seconds(t), y_min), (seconds(t), y_max)],
                }));
            }
        }
    }
    plots
}

fn seconds(t: &DateTime<chrono::Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

fn clock_label(secs: f64) -> String {
    DateTime::from_timestamp_millis((secs * 1000.0) as i64)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Time range covered by every series of the group.
pub(crate) fn x_bounds(group: &GroupSeries) -> (f64, f64) {
    let times = group.series.iter().flat_map(|series| {
        let times: Vec<f64> = match series {
            Series::Line { points, .. } => points.iter().map(|p| seconds(&p.timestamp)).collect(),
            Series::Marker { positions, .. } => positions.iter().map(seconds).collect(),
        };
        times
    });
    widen(min_max(times), 1.0)
}

/// Value range of the line series, padded by a tenth on each side.
pub(crate) fn y_bounds(group: &GroupSeries) -> (f64, f64) {
    let values = group.series.iter().flat_map(|series| match series {
        Series::Line { points, .. } => points.iter().map(|p| p.value).collect(),
        Series::Marker { .. } => Vec::new(),
    });
    let (min, max) = widen(min_max(values), 1.0);
    let pad = (max - min) * 0.1;
    (min - pad, max + pad)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Degenerate ranges get `half_width` on each side so the axis stays drawable.
fn widen(range: Option<(f64, f64)>, half_width: f64) -> (f64, f64) {
    match range {
        None => (0.0, 2.0 * half_width),
        Some((lo, hi)) if lo == hi => (lo - half_width, hi + half_width),
        Some(range) => range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Point;
    use chrono::{TimeZone, Utc};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn line(name: &str, values: &[(i64, f64)]) -> Series {
        Series::Line {
            name: name.to_string(),
            label: format!("{}: x", name),
            points: values.iter().map(|(s, v)| Point::new(ts(*s), *v)).collect(),
        }
    }

    #[test]
    fn test_bounds_cover_lines_and_markers() {
        let group = GroupSeries {
            series: vec![
                line("a", &[(0, 10.0), (5, 20.0)]),
                Series::Marker {
                    name: "m".to_string(),
                    positions: vec![ts(8)],
                },
            ],
        };
        let (x_min, x_max) = x_bounds(&group);
        assert_eq!(x_min, 1_700_000_000.0);
        assert_eq!(x_max, 1_700_000_008.0);

        let (y_min, y_max) = y_bounds(&group);
        assert_eq!(y_min, 9.0);
        assert_eq!(y_max, 21.0);
    }

    #[test]
    fn test_bounds_of_flat_or_empty_group() {
        let flat = GroupSeries {
            series: vec![line("a", &[(0, 5.0)])],
        };
        assert_eq!(x_bounds(&flat), (1_699_999_999.0, 1_700_000_001.0));
        let (y_min, y_max) = y_bounds(&flat);
        assert!(y_min < 5.0 && y_max > 5.0);

        let empty = GroupSeries::default();
        assert_eq!(x_bounds(&empty), (0.0, 2.0));
    }

    #[test]
    fn test_draw_groups_shows_legend() {
        let groups = vec![
            GroupSeries {
                series: vec![line("heap", &[(0, 1.0), (1, 2.0)])],
            },
            GroupSeries {
                series: vec![line("threads", &[(0, 7.0)])],
            },
        ];
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| draw_groups(frame, &groups)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("heap: x"));
        assert!(text.contains("threads: x"));
    }

    #[test]
    fn test_marker_segments_span_y_bounds() {
        let group = GroupSeries {
            series: vec![
                line("heap", &[(0, 10_000.0), (4, 12_000.0)]),
                Series::Marker {
                    name: "gc".to_string(),
                    positions: vec![ts(1), ts(3)],
                },
            ],
        };
        let (y_min, y_max) = y_bounds(&group);
        let plots = plots(&group, y_min, y_max);

        // Line, legend entry for the marker, then one segment per position.
        assert_eq!(plots.len(), 4);
        assert_eq!(plots[1].name.as_deref(), Some("gc"));
        assert!(plots[1].data.is_empty());
        let t = seconds(&ts(1));
        assert_eq!(plots[2].data, vec![(t, y_min), (t, y_max)]);
        assert!(plots[2].name.is_none());
    }

    #[test]
    fn test_marker_drawn_when_axis_excludes_zero() {
        let groups = vec![GroupSeries {
            series: vec![
                line("heap", &[(0, 10_000.0), (4, 12_000.0)]),
                Series::Marker {
                    name: "gc".to_string(),
                    positions: vec![ts(2)],
                },
            ],
        }];
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| draw_groups(frame, &groups)).unwrap();

        let buffer = terminal.backend().buffer();
        let marked_rows = buffer
            .content()
            .chunks(80)
            .filter(|row| row.iter().any(|c| c.fg == Theme::MARKER))
            .count();
        // Legend row plus a vertical segment through the plot area.
        assert!(marked_rows >= 10, "marker drawn on {} rows", marked_rows);
    }
}
