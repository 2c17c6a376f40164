use super::ui;
use crate::core::conversion::ConversionView;
use crate::core::session::ConverterSession;
use anyhow::Result;
use comfy_table::Cell;

const BAR_WIDTH: usize = 24;

impl ConversionView {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("You send"),
            ui::header_cell("You receive"),
            ui::header_cell("Mid-market rate"),
            ui::header_cell("24h change"),
        ]);

        let converted = if self.loading {
            "...".to_string()
        } else {
            format!("{} {}", self.converted_amount, self.target)
        };
        let has_rate = self.exchange_rate != "--";
        table.add_row(vec![
            Cell::new(format!("{} {}", self.amount, self.base)),
            ui::value_cell(&converted, !has_rate),
            ui::value_cell(&self.exchange_rate, !has_rate),
            ui::change_cell(self.change_percent),
        ]);

        let favorite = if self.is_favorite { " ♥" } else { "" };
        let mut output = format!(
            "{}{}\n\n",
            ui::style_text(
                &format!("{} → {}", self.base, self.target),
                ui::StyleType::Title
            ),
            favorite
        );
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\n1 {} = {} {}",
            ui::style_text(&self.base, ui::StyleType::TotalLabel),
            ui::style_text(&self.exchange_rate, ui::StyleType::TotalValue),
            self.target
        ));

        if !self.last_updated_label.is_empty() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Updated at {}", self.last_updated_label),
                    ui::StyleType::Subtle
                )
            ));
        }

        if !self.error.is_empty() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(&self.error, ui::StyleType::Error)
            ));
        }

        output
    }

    /// Illustrative trend chart; the samples are synthetic.
    pub fn display_trend(&self) -> String {
        if self.trend_samples.is_empty() {
            return ui::style_text("Loading chart data...", ui::StyleType::Subtle);
        }

        let (min, max) = self
            .trend_samples
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), s| {
                (lo.min(s.value), hi.max(s.value))
            });

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Time"),
            ui::header_cell("Rate"),
            ui::header_cell("Trend"),
        ]);
        for sample in &self.trend_samples {
            table.add_row(vec![
                Cell::new(&sample.label),
                ui::value_cell(&format!("{:.6}", sample.value), false),
                Cell::new(ui::bar(sample.value, min, max, BAR_WIDTH)),
            ]);
        }

        format!(
            "{}\n\n{}",
            ui::style_text("Exchange Rate Trend (illustrative)", ui::StyleType::Title),
            table
        )
    }
}

/// Fetches rates once and returns the settled view.
pub async fn fetch_view(mut session: ConverterSession, show_progress: bool) -> ConversionView {
    let pb = show_progress.then(|| ui::new_spinner("Fetching rates..."));
    session.start();
    session.settle().await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    session.state().view()
}

pub fn render(view: &ConversionView, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(view)?);
    }
    Ok(format!(
        "{}\n{}\n{}",
        view.display_as_table(),
        ui::separator(),
        view.display_trend()
    ))
}

/// Fetches rates once and prints the result.
pub async fn run(session: ConverterSession, json: bool) -> Result<()> {
    let view = fetch_view(session, !json).await;
    println!("{}", render(&view, json)?);
    Ok(())
}
