use assert_cmd::Command;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let kb = json!([
        {
            "url": "https://x/licencia",
            "categoria": "transito",
            "data": {
                "titulo": "Licencia de Conducir",
                "descripcion": "Obtener la licencia",
                "requisitos": ["DNI", "Certificado médico"],
                "direccion": "Av. 25 de Mayo 123"
            }
        },
        {
            "url": "https://x/cedula",
            "data": {
                "titulo": "Cédula",
                "descripcion": "Emisión de cédula",
                "opciones_ubicacion": [
                    { "nombre": "Central", "direccion": "Belgrano 456" },
                    { "nombre": "Clorinda", "direccion": "San Martín 12" }
                ]
            }
        }
    ]);
    std::fs::write(dir.path().join("kb.json"), kb.to_string()).unwrap();
    dir
}

fn tramites(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tramites"));
    cmd.current_dir(dir)
        .env("TRAMITES_EMBEDDING_MODE", "stub")
        .env_remove("OPENROUTER_API_KEY")
        .args(["--knowledge-base", "kb.json"]);
    cmd
}

fn ask(dir: &Path, message: &str) -> (bool, Value) {
    let output = tramites(dir)
        .args(["ask", message, "--state", "state.json"])
        .output()
        .unwrap();
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    (output.status.success(), body)
}

#[test]
fn multi_office_selection_survives_between_invocations() {
    let dir = workspace();

    let (ok, first) = ask(dir.path(), "Cédula. Emisión de cédula");
    assert!(ok, "{first}");
    assert_eq!(first["status"], "awaiting_selection");
    assert_eq!(first["response"]["needsSelection"], true);
    assert_eq!(
        first["response"]["locationOptions"].as_array().unwrap().len(),
        2
    );

    let (ok, chosen) = ask(dir.path(), "2");
    assert!(ok, "{chosen}");
    assert_eq!(chosen["route"], "selection");
    assert!(chosen["response"]["text"]
        .as_str()
        .unwrap()
        .contains("San Martín 12"));

    let state: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("state.json")).unwrap()).unwrap();
    assert_eq!(state["history"].as_array().unwrap().len(), 2);
    assert!(state["pendingSelection"].is_null());
}

fn ask_request(dir: &Path, request: &Value) -> (bool, Value) {
    std::fs::write(dir.join("request.json"), request.to_string()).unwrap();
    let output = tramites(dir)
        .args(["ask", "--request", "request.json"])
        .output()
        .unwrap();
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    (output.status.success(), body)
}

#[test]
fn turn_requests_carry_context_in_camel_case() {
    let dir = workspace();

    let (ok, first) = ask_request(
        dir.path(),
        &json!({ "message": "Cédula. Emisión de cédula", "activeRecord": null, "history": [] }),
    );
    assert!(ok, "{first}");
    assert_eq!(first["response"]["needsSelection"], true);
    assert_eq!(
        first["response"]["locationOptions"].as_array().unwrap().len(),
        2
    );
    let state = &first["state"];
    assert_eq!(state["pendingSelection"]["locations"][1]["nombre"], "Clorinda");
    assert!(state.get("pending_selection").is_none());

    let mut next = state.clone();
    next["message"] = json!("2");
    let (ok, chosen) = ask_request(dir.path(), &next);
    assert!(ok, "{chosen}");
    assert_eq!(chosen["route"], "selection");
    assert_eq!(chosen["response"]["needsSelection"], false);
    assert_eq!(
        chosen["state"]["activeRecord"]["data"]["direccion"],
        "San Martín 12"
    );
    assert!(chosen["state"]["pendingSelection"].is_null());
    assert_eq!(chosen["state"]["history"].as_array().unwrap().len(), 2);
    assert!(!dir.path().join("state.json").exists());
}

#[test]
fn embeddings_are_persisted_next_to_the_data() {
    let dir = workspace();
    tramites(dir.path()).arg("index").assert().success();

    let cache: Value = serde_json::from_slice(
        &std::fs::read(dir.path().join("data/tramites_embeddings.json")).unwrap(),
    )
    .unwrap();
    assert!(cache["model"].is_string());
    assert_eq!(cache["vectors"].as_object().unwrap().len(), 2);

    tramites(dir.path()).arg("index").assert().success();
}

#[test]
fn follow_up_questions_use_the_active_procedure() {
    let dir = workspace();

    let (ok, _) = ask(dir.path(), "Licencia de Conducir. Obtener la licencia");
    assert!(ok);
    let (ok, body) = ask(dir.path(), "requisitos");
    assert!(ok, "{body}");
    assert_eq!(body["response"]["intent"], "REQUIREMENTS");
    assert!(body["response"]["text"]
        .as_str()
        .unwrap()
        .contains("Certificado médico"));
}

#[test]
fn unmatched_question_without_generator_fails() {
    let dir = workspace();
    let (ok, body) = ask(dir.path(), "receta de empanadas salteñas caseras");
    assert!(!ok);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["route"], "no_match");
    assert!(!dir.path().join("state.json").exists() || {
        let state: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("state.json")).unwrap())
                .unwrap();
        state["history"].as_array().unwrap().is_empty()
    });
}

#[test]
fn toxic_message_is_answered_without_a_lookup() {
    let dir = workspace();
    let (ok, body) = ask(dir.path(), "sos un idiota");
    assert!(ok);
    assert_eq!(body["route"], "moderation");
    assert_eq!(
        body["response"]["text"],
        "Usá un lenguaje respetuoso, por favor. Estoy para ayudarte."
    );
    assert!(!dir.path().join("state.json").exists());
}

#[test]
fn index_scores_queries_against_records() {
    let dir = workspace();
    let output = tramites(dir.path())
        .args(["index", "--query", "Licencia de Conducir. Obtener la licencia"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["records"], 2);
    assert_eq!(body["indexed"], 2);
    assert_eq!(body["hits"][0]["title"], "Licencia de Conducir");
    assert!(body["hits"][0]["score"].as_f64().unwrap() > 0.99);
}

#[test]
fn schema_lists_turn_types() {
    let dir = workspace();
    tramites(dir.path())
        .arg("schema")
        .assert()
        .success()
        .stdout(predicates::str::contains("TurnRequest"))
        .stdout(predicates::str::contains("TurnResponse"));
}
