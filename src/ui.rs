use crate::arbitrage::find_opportunities;
use crate::fetch;
use crate::items::{generate_item_list, CATEGORIES, LOCATIONS};
use crate::model::{Opportunity, Quote, SellStrategy};
use crate::normalize::{normalize_batch, tier_from_item_id};
use crate::store;
use chrono::{DateTime, Utc};
use eframe::egui;
use egui::{Color32, Context, FontFamily, FontId, Margin, RichText, Stroke, Vec2, Visuals};
use egui_extras::{Column, TableBuilder};
use tracing::{error, info};

pub const DB_FILE: &str = "albion_market.db";
const SAMPLE_FILE: &str = "sample_data.json";
const EXPORT_FILE: &str = "albion_arbitrage_opportunities.csv";

const DEFAULT_FEE_PCT: f64 = 4.5;
const DEFAULT_TRANSPORT_COST: i64 = 500;
const DEFAULT_TOP_N: usize = 100;

pub fn set_custom_style(ctx: &Context) {
    // Dark slate-and-gold market board theme
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(16, 18, 22);
    visuals.window_fill = Color32::from_rgb(22, 25, 30);
    visuals.extreme_bg_color = Color32::from_rgb(34, 38, 46);
    visuals.faint_bg_color = Color32::from_rgb(28, 32, 38);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(38, 42, 50);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, Color32::from_rgb(70, 76, 88));

    visuals.widgets.hovered.bg_fill = Color32::from_rgb(52, 58, 70);
    visuals.widgets.hovered.bg_stroke = Stroke::new(2.0, Color32::from_rgb(190, 160, 90));

    visuals.widgets.active.bg_fill = Color32::from_rgb(64, 70, 84);
    visuals.widgets.active.bg_stroke = Stroke::new(2.0, Color32::from_rgb(240, 200, 110));

    visuals.selection.bg_fill = Color32::from_rgb(60, 66, 80);
    visuals.selection.stroke = Stroke::new(1.0, Color32::from_rgb(240, 205, 110));

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(12.0, 7.0);

    style.text_styles.insert(
        egui::TextStyle::Body,
        FontId::new(15.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Heading,
        FontId::new(22.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Button,
        FontId::new(15.0, FontFamily::Proportional),
    );

    ctx.set_style(style);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SortBy {
    NetProfit,
    ProfitPct,
}

pub struct AlbionApp {
    db_path: String,
    loaded: bool,
    quotes: Vec<Quote>,
    opportunities: Vec<Opportunity>,
    filtered: Vec<Opportunity>,
    status: String,

    // Engine parameters, threaded explicitly into every recompute
    fee_pct: f64,
    transport_cost: i64,
    top_n: usize,
    strategy: SellStrategy,

    // Consumer-side policy applied on top of the ranked result set
    min_roi: f64,
    sort_by: SortBy,
    search: String,
    selected_tier: Option<i64>,

    // Fetch selections
    category_selected: Vec<bool>,
    tier_selected: [bool; 8],
    enchant_selected: [bool; 4],

    selected_row: Option<usize>,
}

impl AlbionApp {
    pub fn new() -> Self {
        let mut tier_selected = [false; 8];
        tier_selected[3] = true; // T4 is the entry-level trade good

        Self {
            db_path: DB_FILE.to_string(),
            loaded: false,
            quotes: vec![],
            opportunities: vec![],
            filtered: vec![],
            status: String::new(),

            fee_pct: DEFAULT_FEE_PCT,
            transport_cost: DEFAULT_TRANSPORT_COST,
            top_n: DEFAULT_TOP_N,
            strategy: SellStrategy::Instant,

            min_roi: 0.0,
            sort_by: SortBy::NetProfit,
            search: "".into(),
            selected_tier: None,

            category_selected: vec![true; CATEGORIES.len()],
            tier_selected,
            enchant_selected: [true, false, false, false],

            selected_row: None,
        }
    }

    fn refresh(&mut self) {
        if let Err(e) = store::init_db(&self.db_path) {
            self.status = format!("DB error: {e}");
            return;
        }
        match store::load_quotes(&self.db_path) {
            Ok(quotes) => self.quotes = quotes,
            Err(e) => {
                error!(%e, "failed to load quotes");
                self.status = format!("DB error: {e}");
                return;
            }
        }

        self.opportunities = find_opportunities(
            &self.quotes,
            self.fee_pct,
            self.transport_cost,
            self.top_n,
            self.strategy,
            Utc::now(),
        );
        self.apply_filters();
        self.loaded = true;
        self.status = format!(
            "{} quotes, {} opportunities",
            self.quotes.len(),
            self.opportunities.len()
        );
    }

    fn selected_items(&self) -> Vec<String> {
        let mut base_ids = Vec::new();
        for (i, (_, items)) in CATEGORIES.iter().enumerate() {
            if self.category_selected[i] {
                base_ids.extend(items.iter().map(|(_, id)| *id));
            }
        }
        let tiers: Vec<i64> = (1..=8)
            .filter(|t| self.tier_selected[(t - 1) as usize])
            .collect();
        let enchants: Vec<i64> = (0..4)
            .filter(|e| self.enchant_selected[*e as usize])
            .collect();
        generate_item_list(&base_ids, &tiers, &enchants)
    }

    fn ingest(&mut self, raw: Vec<crate::normalize::RawQuote>, source: &str) {
        let (quotes, total) = normalize_batch(raw);
        info!(source, total, kept = quotes.len(), "ingesting quote batch");

        match store::init_db(&self.db_path).and_then(|_| store::upsert_quotes(&self.db_path, &quotes))
        {
            Ok(count) => {
                self.refresh();
                self.status = format!(
                    "{source}: {count} of {total} rows stored, {} opportunities",
                    self.opportunities.len()
                );
            }
            Err(e) => {
                error!(%e, "failed to store quotes");
                self.status = format!("DB error: {e}");
            }
        }
    }

    fn fetch_from_api(&mut self) {
        let items = self.selected_items();
        let locations: Vec<String> = LOCATIONS.iter().map(|s| s.to_string()).collect();
        let qualities: Vec<i64> = (1..=5).collect();

        match fetch::fetch_prices(&items, &locations, &qualities) {
            Ok(raw) => self.ingest(raw, "API fetch"),
            Err(e) => {
                error!(%e, "price fetch failed");
                self.status = format!("Fetch error: {e}");
            }
        }
    }

    fn load_sample(&mut self) {
        match fetch::load_sample_data(SAMPLE_FILE) {
            Ok(raw) => self.ingest(raw, "sample data"),
            Err(e) => self.status = format!("Sample error: {e}"),
        }
    }

    fn clear_db(&mut self) {
        match store::init_db(&self.db_path).and_then(|_| store::clear(&self.db_path)) {
            Ok(deleted) => {
                self.refresh();
                self.status = format!("Cleared {deleted} quotes");
            }
            Err(e) => self.status = format!("DB error: {e}"),
        }
    }

    /// Min-ROI floor and alternate sort key are consumer policy, applied on
    /// top of the engine's net-profit ranking.
    fn apply_filters(&mut self) {
        let mut filtered = self.opportunities.clone();

        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            filtered.retain(|o| o.item_key.to_lowercase().contains(&needle));
        }

        if let Some(tier) = self.selected_tier {
            filtered.retain(|o| tier_from_item_id(&o.item_key) == tier);
        }

        if self.min_roi > 0.0 {
            filtered.retain(|o| o.profit_pct >= self.min_roi);
        }

        if self.sort_by == SortBy::ProfitPct {
            filtered.sort_by(|a, b| b.profit_pct.total_cmp(&a.profit_pct));
        }

        self.selected_row = None;
        self.filtered = filtered;
    }

    fn export_csv(&mut self) {
        let mut out = String::from(
            "item_key,buy_location,sell_location,buy_price,sell_price,\
             gross_profit,net_profit,profit_pct,confidence_score,\
             buy_observed_at,sell_observed_at\n",
        );
        for o in &self.filtered {
            out.push_str(&format!(
                "{},{},{},{},{},{},{:.0},{:.1},{:.2},{},{}\n",
                o.item_key,
                o.buy_location,
                o.sell_location,
                o.buy_price,
                o.sell_price,
                o.gross_profit,
                o.net_profit,
                o.profit_pct,
                o.confidence_score,
                o.buy_observed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                o.sell_observed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ));
        }

        match std::fs::write(EXPORT_FILE, out) {
            Ok(()) => self.status = format!("Exported {} rows to {EXPORT_FILE}", self.filtered.len()),
            Err(e) => self.status = format!("Export error: {e}"),
        }
    }

    fn confidence_color(score: f64) -> Color32 {
        if score > 0.75 {
            Color32::from_rgb(110, 255, 140)
        } else if score > 0.4 {
            Color32::from_rgb(230, 210, 110)
        } else {
            Color32::from_rgb(255, 120, 110)
        }
    }
}

impl eframe::App for AlbionApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);

            ui.horizontal(|ui| {
                ui.heading(
                    RichText::new("⚖ Albion Market Arbitrage Analyzer")
                        .color(Color32::from_rgb(240, 205, 110))
                        .strong()
                        .size(24.0),
                );
            });

            ui.add_space(4.0);
            ui.separator();
            ui.add_space(4.0);

            ui.horizontal(|ui| {
                if ui
                    .add_sized(
                        Vec2::new(130.0, 32.0),
                        egui::Button::new(
                            RichText::new("⬇ Fetch Prices")
                                .color(Color32::from_rgb(240, 210, 120))
                                .strong(),
                        ),
                    )
                    .clicked()
                {
                    self.fetch_from_api();
                }

                if ui.button("Load Sample Data").clicked() {
                    self.load_sample();
                }

                if ui.button("Clear Database").clicked() {
                    self.clear_db();
                }

                if ui.button("⟳ Recompute").clicked() {
                    self.refresh();
                }

                ui.separator();

                ui.label(RichText::new("🔎").color(Color32::from_rgb(200, 185, 120)));
                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search)
                        .hint_text("Filter item ID...")
                        .desired_width(200.0),
                );
                if search.changed() && self.loaded {
                    self.apply_filters();
                }

                ui.separator();
                ui.label(
                    RichText::new(&self.status).color(Color32::from_rgb(170, 160, 130)),
                );
            });

            ui.add_space(2.0);
        });

        egui::SidePanel::right("settings")
            .min_width(260.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                ui.heading(
                    RichText::new("⚙ Trade Settings").color(Color32::from_rgb(240, 205, 110)),
                );
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.label(RichText::new("Market Fee (%)").strong());
                    if ui
                        .add(
                            egui::Slider::new(&mut self.fee_pct, 0.0..=20.0)
                                .suffix("%")
                                .step_by(0.1),
                        )
                        .changed()
                        && self.loaded
                    {
                        self.refresh();
                    }

                    ui.add_space(6.0);
                    ui.label(RichText::new("Transport Cost (Silver)").strong());
                    if ui
                        .add(
                            egui::DragValue::new(&mut self.transport_cost)
                                .range(0..=1_000_000)
                                .speed(50),
                        )
                        .changed()
                        && self.loaded
                    {
                        self.refresh();
                    }

                    ui.add_space(6.0);
                    ui.label(RichText::new("Sell Strategy").strong());
                    ui.horizontal(|ui| {
                        if ui
                            .selectable_value(&mut self.strategy, SellStrategy::Instant, "Instant")
                            .clicked()
                            && self.loaded
                        {
                            self.refresh();
                        }
                        if ui
                            .selectable_value(&mut self.strategy, SellStrategy::Listed, "Listed")
                            .clicked()
                            && self.loaded
                        {
                            self.refresh();
                        }
                    });

                    ui.add_space(6.0);
                    ui.label(RichText::new("Top N Routes").strong());
                    let mut top_n = self.top_n as i64;
                    if ui
                        .add(egui::DragValue::new(&mut top_n).range(1..=1000).speed(5))
                        .changed()
                    {
                        self.top_n = top_n.max(1) as usize;
                        if self.loaded {
                            self.refresh();
                        }
                    }

                    ui.add_space(10.0);
                    ui.separator();

                    ui.label(RichText::new("📈 Min ROI").strong());
                    if ui
                        .add(
                            egui::Slider::new(&mut self.min_roi, 0.0..=100.0)
                                .suffix("%")
                                .step_by(1.0),
                        )
                        .changed()
                        && self.loaded
                    {
                        self.apply_filters();
                    }

                    ui.add_space(6.0);
                    ui.label(RichText::new("Sort By").strong());
                    egui::ComboBox::from_id_salt("sort_by")
                        .selected_text(match self.sort_by {
                            SortBy::NetProfit => "Net Profit",
                            SortBy::ProfitPct => "Profit %",
                        })
                        .show_ui(ui, |ui| {
                            for (sort, label) in [
                                (SortBy::NetProfit, "Net Profit"),
                                (SortBy::ProfitPct, "Profit %"),
                            ] {
                                if ui.selectable_value(&mut self.sort_by, sort, label).clicked()
                                    && self.loaded
                                {
                                    self.apply_filters();
                                }
                            }
                        });

                    ui.add_space(6.0);
                    ui.label(RichText::new("Tier Filter").strong());
                    ui.horizontal_wrapped(|ui| {
                        for tier in 1..=8_i64 {
                            let is_selected = self.selected_tier == Some(tier);
                            if ui
                                .selectable_label(is_selected, format!("T{tier}"))
                                .clicked()
                            {
                                self.selected_tier = if is_selected { None } else { Some(tier) };
                                self.apply_filters();
                            }
                        }
                    });

                    ui.add_space(10.0);
                    ui.separator();

                    ui.label(RichText::new("🗃 Fetch Selection").strong());
                    for (i, (name, _)) in CATEGORIES.iter().enumerate() {
                        ui.checkbox(&mut self.category_selected[i], *name);
                    }

                    ui.add_space(6.0);
                    ui.label("Tiers");
                    ui.horizontal_wrapped(|ui| {
                        for tier in 1..=8 {
                            ui.checkbox(&mut self.tier_selected[tier - 1], format!("T{tier}"));
                        }
                    });

                    ui.label("Enchantments");
                    ui.horizontal_wrapped(|ui| {
                        for ench in 0..4 {
                            let label = if ench == 0 {
                                "Flat".to_string()
                            } else {
                                format!("@{ench}")
                            };
                            ui.checkbox(&mut self.enchant_selected[ench], label);
                        }
                    });

                    ui.add_space(10.0);
                    ui.separator();

                    if ui
                        .button(RichText::new("💾 Export CSV").color(Color32::from_rgb(150, 220, 150)))
                        .clicked()
                    {
                        self.export_csv();
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.loaded {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(100.0);
                        ui.label(
                            RichText::new("⚖")
                                .size(80.0)
                                .color(Color32::from_rgb(240, 205, 110)),
                        );
                        ui.add_space(20.0);
                        ui.label(
                            RichText::new("Welcome to the Albion Arbitrage Analyzer")
                                .size(24.0)
                                .color(Color32::from_rgb(200, 190, 150)),
                        );
                        ui.add_space(10.0);
                        ui.label(
                            RichText::new(
                                "Fetch prices or load sample data to scan for trade routes",
                            )
                            .color(Color32::from_rgb(170, 160, 130)),
                        );
                    });
                });
                return;
            }

            if self.filtered.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.label(
                            RichText::new("🔍")
                                .size(60.0)
                                .color(Color32::from_rgb(150, 140, 110)),
                        );
                        ui.add_space(10.0);
                        ui.label(
                            RichText::new("No profitable routes found")
                                .size(20.0)
                                .color(Color32::from_rgb(190, 180, 140)),
                        );
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Try lowering the fee, transport cost or ROI floor")
                                .color(Color32::from_rgb(160, 150, 120)),
                        );
                    });
                });
                return;
            }

            let now = Utc::now();

            TableBuilder::new(ui)
                .striped(true)
                .vscroll(true)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .column(Column::remainder().at_least(200.0).clip(true)) // Item
                .column(Column::exact(220.0)) // Route
                .column(Column::exact(100.0)) // Buy
                .column(Column::exact(100.0)) // Sell
                .column(Column::exact(110.0)) // Net profit
                .column(Column::exact(80.0))  // ROI
                .column(Column::exact(100.0)) // Confidence
                .column(Column::exact(120.0)) // Ages
                .header(30.0, |mut header| {
                    for title in [
                        "Item", "Route", "Buy", "Sell", "Net Profit", "ROI %", "Confidence",
                        "Seen (buy/sell)",
                    ] {
                        header.col(|ui| {
                            ui.heading(
                                RichText::new(title)
                                    .color(Color32::from_rgb(200, 190, 150))
                                    .size(16.0),
                            );
                        });
                    }
                })
                .body(|body| {
                    body.rows(32.0, self.filtered.len(), |mut row| {
                        let i = row.index();
                        let o = &self.filtered[i];
                        let is_selected = self.selected_row == Some(i);

                        row.col(|ui| {
                            let mut text = RichText::new(&o.item_key);
                            if is_selected {
                                text = text.color(Color32::from_rgb(255, 220, 110)).strong();
                            }
                            if ui.selectable_label(is_selected, text).clicked() {
                                self.selected_row = if is_selected { None } else { Some(i) };
                            }
                        });

                        row.col(|ui| {
                            ui.label(
                                RichText::new(format!("{} → {}", o.buy_location, o.sell_location))
                                    .color(Color32::from_rgb(180, 200, 255)),
                            );
                        });

                        row.col(|ui| {
                            ui.label(
                                RichText::new(format_silver(o.buy_price as f64))
                                    .color(Color32::from_rgb(255, 150, 150)),
                            );
                        });

                        row.col(|ui| {
                            ui.label(
                                RichText::new(format_silver(o.sell_price as f64))
                                    .color(Color32::from_rgb(150, 255, 150)),
                            );
                        });

                        row.col(|ui| {
                            let profit_color = if o.net_profit > 10_000.0 {
                                Color32::from_rgb(110, 255, 140)
                            } else if o.net_profit > 1_000.0 {
                                Color32::from_rgb(170, 255, 180)
                            } else {
                                Color32::from_rgb(210, 255, 210)
                            };
                            ui.label(
                                RichText::new(format_silver(o.net_profit))
                                    .color(profit_color)
                                    .strong(),
                            );
                        });

                        row.col(|ui| {
                            let roi_color = if o.profit_pct > 20.0 {
                                Color32::from_rgb(110, 255, 140)
                            } else if o.profit_pct > 5.0 {
                                Color32::from_rgb(200, 255, 180)
                            } else {
                                Color32::from_rgb(255, 255, 160)
                            };
                            ui.label(
                                RichText::new(format!("{:.1}%", o.profit_pct)).color(roi_color),
                            );
                        });

                        row.col(|ui| {
                            ui.label(
                                RichText::new(format!("{:.0}%", o.confidence_score * 100.0))
                                    .color(AlbionApp::confidence_color(o.confidence_score)),
                            );
                        });

                        row.col(|ui| {
                            ui.label(
                                RichText::new(format!(
                                    "{} / {}",
                                    format_age(o.buy_observed_at, now),
                                    format_age(o.sell_observed_at, now)
                                ))
                                .color(Color32::from_rgb(170, 170, 180)),
                            );
                        });
                    });
                });

            if let Some(idx) = self.selected_row {
                if let Some(o) = self.filtered.get(idx) {
                    ui.add_space(10.0);
                    ui.separator();

                    egui::Frame::new()
                        .fill(Color32::from_rgb(28, 32, 38))
                        .stroke(Stroke::new(2.0, Color32::from_rgb(80, 86, 100)))
                        .inner_margin(Margin::same(12))
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(
                                    RichText::new("⎘ Route:")
                                        .color(Color32::from_rgb(240, 205, 110))
                                        .strong(),
                                );
                                ui.label(
                                    RichText::new(format!(
                                        "{}  buy {} @ {}  sell {} @ {}  gross {}",
                                        o.item_key,
                                        format_silver(o.buy_price as f64),
                                        o.buy_location,
                                        format_silver(o.sell_price as f64),
                                        o.sell_location,
                                        format_silver(o.gross_profit as f64),
                                    ))
                                    .color(Color32::from_rgb(200, 190, 150)),
                                );
                            });
                        });
                }
            }
        });
    }
}

fn format_silver(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.2}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}

fn format_age(observed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match observed_at {
        None => "n/a".to_string(),
        Some(ts) => {
            let hours = (now - ts).num_minutes() as f64 / 60.0;
            if hours < 1.0 {
                format!("{:.0}m", hours * 60.0)
            } else if hours < 48.0 {
                format!("{hours:.1}h")
            } else {
                format!("{:.1}d", hours / 24.0)
            }
        }
    }
}
