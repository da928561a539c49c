//!
//! conectatech CLI binary
//! ----------------------
//! Command-line front end over the ConectaTech client core. The session is cached in a
//! JSON file between invocations so `login` once, then run the other commands.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use conectatech::api::resources::ResourceType;
use conectatech::api::{filter_contacts, filter_resources};
use conectatech::cli;
use conectatech::config::ClientConfig;
use conectatech::error::AppError;
use conectatech::identity::{PermissionGuard, Role};
use conectatech::navigation::{RootGraph, Route, StackNavigator};
use conectatech::validation::{ContactForm, LoginForm, RegisterForm, ResourceForm, ValidationErrors};
use conectatech::Client;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <command> [args]\n\nCommands:\n  login <email> <password>            start a session\n  logout                              end the session\n  status                              show the current session\n  profile                             refresh the user record from the server\n  contacts [search]                   list contacts, optionally filtered by name or plate\n  resources [search]                  list resources, optionally filtered by title, detail or type\n  contact-add --name <n> --boss <b> --position <p> --plate <pl> --vehicle-type <t> --phone <num> [--phone <num> ...]\n  resource-add --title <t> --detail <d> --type <documento|video> --url <url>\n  register --nombre <n> --apellido <a> --email <e> --password <p> --role <maestro|supervisor|normal>\n\nEnvironment:\n  CONECTATECH_API_BASE_URL   API base URL (default http://127.0.0.1:3000/api)\n  CONECTATECH_SESSION_FILE   session cache file (default ~/.conectatech/session.json)\n  CONECTATECH_LOGOUT_ON_401  end the session when the API answers 401 (default true)\n  CONECTATECH_CONFIG         optional JSON config file\n  RUST_LOG                   log filter (default info)"
    );
}

/// Collect `--flag value` pairs; repeated flags keep every value in order.
fn parse_flags(args: &[String]) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut it = args.iter();
    while let Some(a) = it.next() {
        let Some(name) = a.strip_prefix("--") else {
            return Err(anyhow!("unexpected argument '{}'", a));
        };
        let value = it.next().ok_or_else(|| anyhow!("missing value for --{}", name))?;
        out.push((name.to_string(), value.clone()));
    }
    Ok(out)
}

fn flag(flags: &[(String, String)], name: &str) -> String {
    flags.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()).unwrap_or_default()
}

fn default_session_file() -> PathBuf {
    let home = env::var("HOME").or_else(|_| env::var("USERPROFILE")).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));
    home.join(".conectatech").join("session.json")
}

fn print_validation(errors: &ValidationErrors) {
    for (field, msg) in errors.iter() {
        eprintln!("  {}: {}", field, msg);
    }
}

fn report(err: &AppError) -> anyhow::Error {
    eprintln!("{}: {}", err.dialog_title(), err.message());
    anyhow!(err.clone())
}

/// Run the route's permission guard; on denial show the alert, acknowledge it and say where
/// the user was sent.
fn require_access(client: &Client, route: Route) -> Result<()> {
    if RootGraph::for_snapshot(&client.session.snapshot()) != RootGraph::Main {
        return Err(anyhow!("no hay sesión activa; ejecuta `login` primero"));
    }
    let mut guard = PermissionGuard::for_route(route, client.session.subscribe());
    if guard.has_access() {
        return Ok(());
    }
    if let Some(alert) = guard.pending_alert() {
        eprintln!("{}\n{}\n[{}]", alert.title, alert.message, alert.button_text);
    }
    let mut nav = StackNavigator::new(Route::DEFAULT_FALLBACK);
    nav.push(route);
    guard.acknowledge(&mut nav);
    Err(anyhow!("access to {} denied; redirected to {}", route, nav.current().unwrap_or(Route::DEFAULT_FALLBACK)))
}

async fn run(client: &Client, command: &str, rest: &[String]) -> Result<()> {
    match command {
        "login" => {
            let form = LoginForm {
                email: rest.first().cloned().unwrap_or_default(),
                password: rest.get(1).cloned().unwrap_or_default(),
            };
            let creds = match form.validate() {
                Ok(c) => c,
                Err(errors) => {
                    print_validation(&errors);
                    return Err(anyhow!(AppError::from(errors)));
                }
            };
            match client.session.login_with_error(&creds).await {
                Ok(session) => println!("{}", cli::describe_user(&session.user)),
                Err(e) => return Err(report(&e)),
            }
        }
        "logout" => {
            client.session.logout();
            println!("sesión cerrada");
        }
        "status" => println!("{}", cli::describe_session(&client.session.snapshot())),
        "profile" => {
            let user = client.session.refresh_profile().await.map_err(|e| report(&e))?;
            println!("{}", cli::describe_user(&user));
        }
        "contacts" => {
            require_access(client, Route::Contacts)?;
            let term = rest.join(" ");
            let contacts = client.contacts.list().await.map_err(|e| report(&e))?;
            let shown = filter_contacts(&contacts, &term);
            println!("{}", cli::contacts_table(&shown, !term.trim().is_empty()));
        }
        "resources" => {
            require_access(client, Route::Resources)?;
            let term = rest.join(" ");
            let resources = client.resources.list().await.map_err(|e| report(&e))?;
            let shown = filter_resources(&resources, &term);
            println!("{}", cli::resources_table(&shown, !term.trim().is_empty()));
        }
        "contact-add" => {
            require_access(client, Route::ContactForm)?;
            let flags = parse_flags(rest)?;
            let form = ContactForm {
                full_name: flag(&flags, "name"),
                boss_name: flag(&flags, "boss"),
                position: flag(&flags, "position"),
                contact_numbers: flags.iter().filter(|(k, _)| k == "phone").map(|(_, v)| v.clone()).collect(),
                vehicle_plate: flag(&flags, "plate"),
                vehicle_type: flag(&flags, "vehicle-type"),
            };
            let payload = form.validate().map_err(|errors| {
                print_validation(&errors);
                anyhow!(AppError::from(errors))
            })?;
            let receipt = client.contacts.create(&payload).await.map_err(|e| report(&e))?;
            println!("Contacto creado exitosamente. {}", receipt.message);
        }
        "resource-add" => {
            require_access(client, Route::ResourceForm)?;
            let flags = parse_flags(rest)?;
            let form = ResourceForm {
                title: flag(&flags, "title"),
                detail: flag(&flags, "detail"),
                type_resource: ResourceType::parse(&flag(&flags, "type")),
                url_resource: flag(&flags, "url"),
            };
            let payload = form.validate().map_err(|errors| {
                print_validation(&errors);
                anyhow!(AppError::from(errors))
            })?;
            let receipt = client.resources.create(&payload).await.map_err(|e| report(&e))?;
            println!("Recurso creado exitosamente. {}", receipt.message);
        }
        "register" => {
            require_access(client, Route::Register)?;
            let flags = parse_flags(rest)?;
            let form = RegisterForm {
                nombre: flag(&flags, "nombre"),
                apellido: flag(&flags, "apellido"),
                email: flag(&flags, "email"),
                password: flag(&flags, "password"),
                role: Role::parse(&flag(&flags, "role")),
            };
            let creds = form.validate().map_err(|errors| {
                print_validation(&errors);
                anyhow!(AppError::from(errors))
            })?;
            let resp = client.session.register(&creds).await.map_err(|e| report(&e))?;
            match (resp.success, resp.user) {
                (true, Some(u)) => println!("Usuario {} creado exitosamente con el rol: {}.", u.email, u.role),
                (_, _) => {
                    let detail = resp.message.unwrap_or_else(|| "Respuesta inesperada del servidor.".to_string());
                    return Err(anyhow!("Error al crear el usuario. Detalles: {}", detail));
                }
            }
        }
        other => return Err(anyhow!("unknown command '{}'", other)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("conectatech");
    let Some(command) = args.get(1) else {
        print_usage(program);
        return Ok(());
    };
    if command == "-h" || command == "--help" || command == "help" {
        print_usage(program);
        return Ok(());
    }

    let mut cfg = ClientConfig::from_env().context("loading configuration")?;
    if cfg.session_file.is_none() {
        cfg.session_file = Some(default_session_file());
    }
    info!(
        target: "conectatech",
        "conectatech: api_base_url='{}', session_file={:?}, logout_on_401={}",
        cfg.api_base_url, cfg.session_file, cfg.logout_on_unauthorized
    );
    let client = Client::connect(&cfg).context("initializing client")?;
    run(&client, command, &args[2..]).await
}
