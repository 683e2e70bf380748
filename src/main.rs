// src/main.rs - Upload relay service

use rocket::launch;

use tunecloud::config::Config;

#[launch]
fn rocket() -> rocket::Rocket<rocket::Build> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    println!("============================================================");
    println!("TuneCloud - Upload Relay");
    println!("============================================================");
    println!("🌐 Listening on:   http://{}:{}", config.host, config.port);
    println!("📦 Upload limit:   {} MB", config.max_upload_bytes / (1024 * 1024));
    match &config.media_host_url {
        Some(url) => println!("☁️  Media host:     {}", url),
        None => println!("💾 Local media:    {}", config.media_dir.display()),
    }
    println!("🗂️  Documents:      {}", config.snapshot_file().display());
    println!("============================================================");

    match tunecloud::build_rocket(config) {
        Ok(rocket) => rocket,
        Err(e) => {
            eprintln!("Failed to start relay: {}", e);
            std::process::exit(1);
        }
    }
}
