use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::components::session::{SessionState, SessionStore};
use crate::components::talks::{TalkAction, TalkList, TalkState, TalkStore};
use crate::console::{dispatch, render, Command, Dispatch, HELP};
use crate::environment::types::{ClientId, Identity};
use crate::environment::{Environment, GraphQlModel, HostedUiAuth, LogFailures, Repository};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run() -> Result<(), String> {
    use env_logger::Env;
    use std::io::Write;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        // stdout belongs to the console
        .target(env_logger::Target::Stderr)
        .init();

    // One thread: every reduction happens on this event loop
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Could not start runtime: {e:?}"))?;
    runtime.block_on(event_loop())
}

fn environment() -> Result<Environment, String> {
    let repository = Repository::new()?;
    log::info!("Using configuration in {}", repository.directory().display());
    let config = repository.config()?;
    let api = GraphQlModel::new(&config.backend, repository.clone())?;
    let auth = HostedUiAuth::new(config.auth, repository);
    Ok(Environment::new(
        Arc::new(api),
        Arc::new(auth),
        Arc::new(LogFailures),
        ClientId::generate(),
    ))
}

async fn event_loop() -> Result<(), String> {
    let environment = environment()?;
    log::debug!("Client {}", environment.client_id);

    let mut session = SessionStore::new(SessionState::default(), environment.clone());
    let mut talks = TalkStore::new(TalkState::default(), environment);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    loop {
        let before = visible(&session, &talks);
        let mut redraw = false;
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Could not read input: {e:?}");
                        break;
                    }
                };
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                match dispatch(command, talks.state()) {
                    Dispatch::Session(action) => session.send(action),
                    Dispatch::Talks(action) => talks.send(action),
                    Dispatch::Show => (),
                    Dispatch::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    Dispatch::Quit => break,
                    Dispatch::Invalid(message) => {
                        println!("{message}");
                        continue;
                    }
                }
                redraw = true;
            }
            _ = session.next() => (),
            _ = talks.next() => (),
        }
        if redraw || visible(&session, &talks) != before {
            print!("{}", render(session.state(), talks.state()));
        }
    }

    talks.send(TalkAction::Unmount);
    // let the subscription say goodbye to the server
    let closed = tokio::time::timeout(CLOSE_TIMEOUT, async {
        while talks.state().closing {
            talks.next().await;
        }
    })
    .await;
    if closed.is_err() {
        log::warn!("Subscription did not close in time");
    }
    Ok(())
}

/// What the background actions can change on screen
fn visible(session: &SessionStore, talks: &TalkStore) -> (Option<Identity>, TalkList, bool) {
    (
        session.state().identity.clone(),
        talks.state().talks.clone(),
        talks.state().loading,
    )
}
