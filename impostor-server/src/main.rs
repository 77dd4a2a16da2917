use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use env_logger::Env;
use log::{error, info};
use serde::Deserialize;

use impostor_core::model::generation_input::GenerationInput;
use impostor_core::model::generator::Generator;
use impostor_core::model::registry::NickSpec;

/// Most authors a single request may blend.
const MAX_NICKS: usize = 2;

/// Keyword selecting a random author.
const RANDOM_KEYWORD: &str = "random";

/// Query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	nicks: Option<String>, // "a:b", "random" or "a:random"; absent -> one random author
	seed: Option<String>,
}

struct SharedData {
	generator: Generator,
}

impl GenerateParams {
	/// Parses the requested authors.
	fn nick_specs(&self) -> Result<Vec<NickSpec>, String> {
		let Some(raw) = self.nicks.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
			return Ok(vec![NickSpec::Random]);
		};

		let specs: Vec<NickSpec> = raw
			.split(':')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(|name| {
				if name.eq_ignore_ascii_case(RANDOM_KEYWORD) {
					NickSpec::Random
				} else {
					NickSpec::explicit(name)
				}
			})
			.collect();

		match specs.len() {
			0 => Err("Nick list cannot be empty".into()),
			n if n > MAX_NICKS => Err(format!("At most {MAX_NICKS} nicks can be blended")),
			_ => Ok(specs),
		}
	}

	fn input(&self) -> Result<GenerationInput, String> {
		let input = GenerationInput::new(self.nick_specs()?);
		Ok(match &self.seed {
			Some(seed) => input.with_seed(seed),
			None => input,
		})
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Returns `[nick:nick] text`, or 404 with an empty body when no author
/// resolved or the seed matched nothing.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let input = match query.input() {
		Ok(input) => input,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};

	let quote = shared_data.generator.generate(&input);
	if quote.is_empty() {
		return HttpResponse::NotFound().finish();
	}
	HttpResponse::Ok().body(format!("[{}] {}", quote.nicks.join(":"), quote.text))
}

#[get("/v1/stats")]
async fn get_stats(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};
	HttpResponse::Ok().json(shared_data.generator.generic_statistics())
}

#[get("/v1/users/{nick}/stats")]
async fn get_user_stats(data: web::Data<Mutex<SharedData>>, nick: web::Path<String>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};
	match shared_data.generator.user_statistics(&nick) {
		Some(stats) => HttpResponse::Ok().json(stats),
		None => HttpResponse::NotFound().finish(),
	}
}

#[get("/v1/users/{nick}/aliases")]
async fn get_user_aliases(data: web::Data<Mutex<SharedData>>, nick: web::Path<String>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};
	HttpResponse::Ok().json(shared_data.generator.user_aliases(&nick))
}

/// Main entry point for the server.
///
/// Loads every user from the source directory (first argument, `./data` by
/// default), wraps the generator in a `Mutex`, and serves it over HTTP.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Usage counters are flushed once more on shutdown.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let source_dir = std::env::args().nth(1).unwrap_or_else(|| "./data".to_owned());
	let generator = Generator::new(&source_dir).map_err(|e| {
		error!("failed to load sources from {source_dir}: {e}");
		std::io::Error::other(e)
	})?;
	info!("serving {} users from {source_dir}", generator.registry().user_count());

	let shared_data = web::Data::new(Mutex::new(SharedData { generator }));
	let server_data = shared_data.clone();

	let result = HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(server_data.clone())
			.service(get_generated)
			.service(get_stats)
			.service(get_user_stats)
			.service(get_user_aliases)
	})
	.bind(("127.0.0.1", 5000))?
	.run()
	.await;

	shutdown(&shared_data, result)
}

/// Flushes usage counters, whatever the server outcome, then returns that outcome.
fn shutdown(data: &Mutex<SharedData>, result: std::io::Result<()>) -> std::io::Result<()> {
	match data.lock() {
		Ok(mut shared) => shared.generator.flush(),
		Err(_) => error!("generator lock poisoned, usage counters not flushed"),
	}
	result
}
