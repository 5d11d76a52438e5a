use plotters::prelude::*;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::predictor::FeatureImportance;
use crate::training::history::TrainingHistory;

fn plot_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Writes the train/test loss curves to a PNG file.
pub fn create_plot(history: &TrainingHistory, path: impl AsRef<Path>) -> Result<()> {
    if history.is_empty() {
        return Err(Error::Plot("no training history to plot".to_string()));
    }

    let root = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let max_epoch = (*history.epochs.last().unwrap_or(&1) as u32).max(1);
    let max_loss = history
        .train_losses
        .iter()
        .chain(history.test_losses.iter())
        .cloned()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
        .max(f64::EPSILON);

    let mut chart = ChartBuilder::on(&root)
        .caption("Training Progress", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0u32..max_epoch, 0f64..max_loss * 1.05)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Epoch")
        .y_desc("MSE (normalised)")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(
            history.epochs.iter().zip(history.train_losses.iter()).map(|(&x, &y)| (x as u32, y)),
            &RED,
        ))
        .map_err(plot_error)?
        .label("Train loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .draw_series(LineSeries::new(
            history.epochs.iter().zip(history.test_losses.iter()).map(|(&x, &y)| (x as u32, y)),
            &BLUE,
        ))
        .map_err(plot_error)?
        .label("Test loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Renders importances as a bar chart, in the order given, to an SVG string.
pub fn importance_chart_svg(importances: &[FeatureImportance]) -> Result<String> {
    if importances.is_empty() {
        return Err(Error::Plot("no feature importances to plot".to_string()));
    }

    let names: Vec<String> = importances.iter().map(|f| f.feature.clone()).collect();
    let max_weight = importances
        .iter()
        .map(|f| f.weight)
        .filter(|w| w.is_finite())
        .fold(0.0, f64::max)
        .max(f64::EPSILON);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (720, 400)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Feature importance", ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(90)
            .y_label_area_size(50)
            .build_cartesian_2d((0..names.len()).into_segmented(), 0f64..max_weight * 1.1)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(names.len())
            .x_label_formatter(&|v: &SegmentValue<usize>| match v {
                SegmentValue::CenterOf(i) => names.get(*i).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .y_desc("Weight")
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.mix(0.7).filled())
                    .margin(6)
                    .data(importances.iter().enumerate().map(|(i, f)| (i, f.weight.max(0.0)))),
            )
            .map_err(plot_error)?;

        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}
