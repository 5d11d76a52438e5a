use std::fmt::Write;

use crate::model::encoder::{CategoricalField, EncodeMap};
use crate::model::features::{limits, PropertyInput};
use crate::model::predictor::FeatureImportance;
use crate::pipeline::{Estimate, SimilarProperties};
use crate::session::history::PredictionHistory;
use crate::utils::currency::CurrencyFormat;

/// What the form submission produced, if anything.
pub enum Outcome<'a> {
    Estimate(&'a Estimate),
    Warning(String),
    Failure(String),
}

pub struct PageView<'a> {
    pub encoder: &'a EncodeMap,
    pub input: &'a PropertyInput,
    pub outcome: Option<Outcome<'a>>,
    pub history: &'a PredictionHistory,
    pub importances: &'a [FeatureImportance],
    pub show_chart: bool,
    pub currency: &'a CurrencyFormat,
}

fn html_escape(value: &str) -> String {
    v_htmlescape::escape(value).to_string()
}

const STYLE: &str = "\
body { font-family: ui-sans-serif, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 24px auto; max-width: 820px; }
form { display: grid; grid-template-columns: 1fr 1fr; gap: 10px 24px; }
label { display: flex; flex-direction: column; font-size: 14px; }
button { grid-column: span 2; padding: 12px; font-weight: bold; }
.result { border: 1px solid #1e40af; border-radius: 10px; padding: 18px; text-align: center; margin: 20px 0; }
.warning { border-left: 5px solid #d97706; padding: 8px 12px; }
.failure { border-left: 5px solid #dc2626; padding: 8px 12px; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #ddd; padding: 6px; text-align: left; font-size: 14px; }
";

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html>\n<html lang=\"id\">\n<head>\n  <meta charset=\"utf-8\">\n");
    html.push_str("  <title>Prediksi Harga Rumah</title>\n");
    let _ = writeln!(html, "  <style>\n{}  </style>\n</head>\n<body>", STYLE);
    html.push_str("<h1>Prediksi Harga Rumah</h1>\n");
    html.push_str("<p>Masukkan detail properti untuk memprediksi harga dalam Rupiah</p>\n");

    render_form(&mut html, view);

    match &view.outcome {
        Some(Outcome::Estimate(estimate)) => render_estimate(&mut html, estimate, view.currency),
        Some(Outcome::Warning(message)) => {
            let _ = writeln!(html, "<div class=\"warning\">{}</div>", html_escape(message));
        }
        Some(Outcome::Failure(message)) => {
            let _ = writeln!(html, "<div class=\"failure\">{}</div>", html_escape(message));
        }
        None => {}
    }

    render_importances(&mut html, view);
    render_history(&mut html, view.history, view.currency);

    html.push_str("</body>\n</html>\n");
    html
}

fn number_field(html: &mut String, name: &str, label: &str, value: String, (min, max): (String, String)) {
    let _ = writeln!(
        html,
        "  <label>{}<input type=\"number\" name=\"{}\" value=\"{}\" min=\"{}\" max=\"{}\" required></label>",
        label, name, value, min, max
    );
}

fn select_field(html: &mut String, name: &str, label: &str, options: &[String], selected: &str) {
    let _ = writeln!(html, "  <label>{}<select name=\"{}\">", label, name);
    for option in options {
        let marker = if option.eq_ignore_ascii_case(selected) { " selected" } else { "" };
        let escaped = html_escape(option);
        let _ = writeln!(html, "    <option value=\"{}\"{}>{}</option>", escaped, marker, escaped);
    }
    html.push_str("  </select></label>\n");
}

fn render_form(html: &mut String, view: &PageView<'_>) {
    let input = view.input;
    let range = |(lo, hi): (u32, u32)| (lo.to_string(), hi.to_string());
    let area = (limits::AREA_M2.0.to_string(), limits::AREA_M2.1.to_string());

    html.push_str("<form method=\"post\" action=\"/predict\">\n");
    number_field(html, "bedrooms", "Jumlah Kamar Tidur", input.bedrooms.to_string(), range(limits::ROOMS));
    number_field(html, "bathrooms", "Jumlah Kamar Mandi", input.bathrooms.to_string(), range(limits::ROOMS));
    number_field(html, "land_size_m2", "Luas Tanah (m²)", input.land_size_m2.to_string(), area.clone());
    number_field(html, "building_size_m2", "Luas Bangunan (m²)", input.building_size_m2.to_string(), area);
    number_field(html, "floors", "Jumlah Lantai", input.floors.to_string(), range(limits::FLOORS));
    number_field(html, "building_age", "Usia Bangunan (tahun)", input.building_age.to_string(), range(limits::BUILDING_AGE));
    number_field(html, "garages", "Jumlah Garasi", input.garages.to_string(), range(limits::GARAGES));

    let fields = [
        (CategoricalField::PropertyType, "Tipe Properti"),
        (CategoricalField::Furnishing, "Perabotan"),
        (CategoricalField::PropertyCondition, "Kondisi Properti"),
    ];
    for (field, label) in fields {
        select_field(html, field.as_str(), label, &view.encoder.choices(field), input.label(field));
    }
    html.push_str("  <button type=\"submit\">PREDIKSI HARGA</button>\n</form>\n");
}

fn render_estimate(html: &mut String, estimate: &Estimate, currency: &CurrencyFormat) {
    let _ = writeln!(
        html,
        "<div class=\"result\"><h2>Estimasi Harga Rumah</h2><h2>{}</h2><p>Perkiraan berdasarkan data properti yang Anda masukkan</p></div>",
        html_escape(&estimate.formatted_price)
    );

    html.push_str("<h2>Properti Serupa</h2>\n");
    match &estimate.similar {
        SimilarProperties::Found(records) => {
            html.push_str("<table>\n<tr><th>Judul</th><th>Alamat</th><th>Harga</th><th>KT/KM</th><th>LT/LB</th></tr>\n");
            for record in records {
                let _ = writeln!(
                    html,
                    "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}/{}</td><td>{}/{} m²</td></tr>",
                    html_escape(&record.url),
                    html_escape(&record.title),
                    html_escape(&record.address),
                    currency.format(record.price_in_rp),
                    record.bedrooms,
                    record.bathrooms,
                    record.land_size_m2,
                    record.building_size_m2
                );
            }
            html.push_str("</table>\n");
        }
        SimilarProperties::NoMatch => {
            html.push_str("<p>Tidak ada properti serupa yang ditemukan.</p>\n");
        }
        SimilarProperties::Failed(message) => {
            let _ = writeln!(
                html,
                "<div class=\"failure\">Gagal mencari properti serupa: {}</div>",
                html_escape(message)
            );
        }
    }
}

fn render_importances(html: &mut String, view: &PageView<'_>) {
    if view.importances.is_empty() {
        return;
    }
    html.push_str("<h2>Pentingnya Fitur dalam Prediksi Harga</h2>\n");
    if view.show_chart {
        html.push_str("<img src=\"/importances.svg\" alt=\"Feature importance chart\">\n");
    }
    html.push_str("<table>\n<tr><th>Fitur</th><th>Pengaruh</th></tr>\n");
    for importance in view.importances {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{:.3}</td></tr>",
            html_escape(&importance.feature),
            importance.weight
        );
    }
    html.push_str("</table>\n");
}

fn render_history(html: &mut String, history: &PredictionHistory, currency: &CurrencyFormat) {
    if history.is_empty() {
        return;
    }
    html.push_str("<h2>Riwayat Prediksi</h2>\n<table>\n<tr><th>Waktu</th><th>Harga</th><th>KT</th><th>LT</th><th>LB</th></tr>\n");
    for entry in history.entries().iter().rev() {
        let field = |name: &str| entry.input.get(name).map(|v| v.to_string()).unwrap_or_default();
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            entry.display_time(),
            currency.format(entry.predicted_price),
            field("bedrooms"),
            field("land_size_m2"),
            field("building_size_m2")
        );
    }
    html.push_str("</table>\n");
}
