use clap::Parser;

use flowscope::app::FlowScopeApp;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON query graph exported by the SQL parser.
    #[arg(long)]
    query_file: String,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "flowscope",
        options,
        Box::new(move |cc| Ok(Box::new(FlowScopeApp::new(cc, args.query_file.clone())))),
    )
}
