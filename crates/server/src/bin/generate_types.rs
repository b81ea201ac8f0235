use std::{fs, path::PathBuf};

use db::models::task::{CreateTask, DeleteTaskResponse, Task, TaskStatus, UpdateTask};
use ts_rs::TS;
use utils::response::ApiResponse;

fn generate_types_content() -> String {
    let header = "// This file was generated by `generate_types`. Do not edit it by hand.\n// Run `cargo run --bin generate_types` to regenerate.";
    let decls = [
        TaskStatus::decl(),
        Task::decl(),
        CreateTask::decl(),
        UpdateTask::decl(),
        DeleteTaskResponse::decl(),
        ApiResponse::<()>::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| format!("export {}", decl.trim_start_matches("export ")))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}\n\n{body}\n")
}

fn main() {
    let check_mode = std::env::args().any(|arg| arg == "--check");
    let shared_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("❌ shared/types.ts is not up to date. Please run 'cargo run --bin generate_types' and commit the changes.");
        std::process::exit(1);
    }

    if let Err(err) = fs::create_dir_all(&shared_path) {
        eprintln!("Failed to create {}: {err}", shared_path.display());
        std::process::exit(1);
    }
    if let Err(err) = fs::write(&types_path, generated) {
        eprintln!("Failed to write {}: {err}", types_path.display());
        std::process::exit(1);
    }
    println!("✅ TypeScript types written to {}", types_path.display());
}
