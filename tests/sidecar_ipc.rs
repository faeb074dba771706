use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_chamadad");
        let config_dir = tempfile::tempdir().expect("config dir");
        let mut child = Command::new(exe)
            .arg("--config")
            .arg(config_dir.path().join("missing.toml"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn chamadad");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        }
    }

    fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value["result"].clone()
    }

    fn request_err(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value["error"].clone()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn create_class(sidecar: &mut Sidecar, name: &str, teacher: &str) -> i64 {
    let result = sidecar.request_ok(
        "classes.create",
        json!({
            "name": name,
            "grade": "6º Ano",
            "year": "2024",
            "teacher": teacher,
        }),
    );
    assert_eq!(result["message"], "Turma criada com sucesso!");
    assert_eq!(result["applied"]["status"], "applied");
    result["applied"]["record"]["id"].as_i64().expect("class id")
}

fn create_student(sidecar: &mut Sidecar, name: &str, class_id: i64) -> serde_json::Value {
    let result = sidecar.request_ok(
        "students.create",
        json!({
            "name": name,
            "email": format!("{}@escola.br", name.to_lowercase()),
            "classId": class_id,
        }),
    );
    assert_eq!(result["message"], "Estudante criado com sucesso!");
    result["applied"]["record"].clone()
}

#[test]
fn requests_before_session_are_refused() {
    let mut sidecar = Sidecar::spawn();

    let health = sidecar.request_ok("health", json!({}));
    assert_eq!(health["connected"], false);
    assert!(health["version"].is_string());

    let e = sidecar.request_err("classes.list", json!({}));
    assert_eq!(e["code"], "no_session");
    let e = sidecar.request_err("students.create", json!({ "name": "Ana" }));
    assert_eq!(e["code"], "no_session");

    let e = sidecar.request_err("workspace.select", json!({}));
    assert_eq!(e["code"], "bad_params");

    let e = sidecar.request_err("attendance.take", json!({}));
    assert_eq!(e["code"], "not_implemented");

    let roster = sidecar.request_ok("roster.get", json!({}));
    assert_eq!(roster["grades"][0], "1º Ano");
    assert_eq!(roster["teachers"].as_array().map(|t| t.len()), Some(3));
}

#[test]
fn classes_and_students_lifecycle_over_workspace() {
    let workspace = tempfile::tempdir().expect("workspace");
    let mut sidecar = Sidecar::spawn();

    let opened = sidecar.request_ok(
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    assert_eq!(opened["stats"]["totalClasses"], 0);
    assert_eq!(sidecar.request_ok("health", json!({}))["connected"], true);

    let turma_a = create_class(&mut sidecar, "Turma A", "Maria Silva");
    let turma_b = create_class(&mut sidecar, "Turma B", "João Santos");

    let next = sidecar.request_ok("students.nextDisplayId", json!({}));
    assert_eq!(next["studentId"], "EST001");

    let ana = create_student(&mut sidecar, "Ana", turma_a);
    assert_eq!(ana["student_id"], "EST001");
    let bruno = create_student(&mut sidecar, "Bruno", turma_b);
    assert_eq!(bruno["student_id"], "EST002");

    let rows = sidecar.request_ok("students.list", json!({ "query": "ANA" }));
    let rows = rows["students"].as_array().expect("rows").clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["className"], "Turma A");
    assert_eq!(rows[0]["classFound"], true);

    let rows = sidecar.request_ok("classes.list", json!({ "query": "joão" }));
    assert_eq!(rows["classes"].as_array().map(|r| r.len()), Some(1));

    // Class records acknowledged at creation carry the count at that time;
    // a refresh picks up the enrolments.
    let stats = sidecar.request_ok("dashboard.stats", json!({}));
    assert_eq!(stats["totalClasses"], 2);
    assert_eq!(stats["totalStudents"], 2);
    assert_eq!(stats["distinctTeachers"], 2);
    assert_eq!(stats["totalStudentsAcrossClasses"], 0);
    let refreshed = sidecar.request_ok("dashboard.refresh", json!({}));
    assert_eq!(refreshed["stats"]["totalStudentsAcrossClasses"], 2);

    let updated = sidecar.request_ok(
        "students.update",
        json!({
            "id": bruno["id"],
            "name": "Bruno Lima",
            "email": "bruno@escola.br",
            "classId": turma_a.to_string(),
            "birthDate": "2014-03-09",
        }),
    );
    assert_eq!(updated["message"], "Estudante atualizado com sucesso!");
    assert_eq!(updated["applied"]["record"]["student_id"], "EST002");
    assert_eq!(updated["applied"]["record"]["birth_date"], "2014-03-09");
    let rows = sidecar.request_ok("students.list", json!({}));
    assert_eq!(rows["students"].as_array().map(|r| r.len()), Some(2));
    assert_eq!(rows["students"][1]["className"], "Turma A");

    let updated = sidecar.request_ok(
        "classes.update",
        json!({
            "id": turma_b,
            "name": "Turma B2",
            "grade": "7º Ano",
            "year": 2025,
            "teacher": "João Santos",
        }),
    );
    assert_eq!(updated["message"], "Turma atualizada com sucesso!");
    assert_eq!(updated["applied"]["record"]["year"], "2025");
}

#[test]
fn delete_requires_confirmation_and_leaves_orphans() {
    let workspace = tempfile::tempdir().expect("workspace");
    let mut sidecar = Sidecar::spawn();
    sidecar.request_ok(
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let turma = create_class(&mut sidecar, "Turma A", "Maria Silva");
    create_student(&mut sidecar, "Ana", turma);

    let intent = sidecar.request_ok("classes.delete", json!({ "id": turma }));
    assert_eq!(intent["prompt"], "Tem certeza que deseja excluir a turma \"Turma A\"?");
    let token = intent["token"].as_str().expect("token").to_string();

    // The class is still there until confirmed.
    let rows = sidecar.request_ok("classes.list", json!({}));
    assert_eq!(rows["classes"].as_array().map(|r| r.len()), Some(1));

    let e = sidecar.request_err(
        "students.deleteConfirm",
        json!({ "token": token, "confirmed": true }),
    );
    assert_eq!(e["code"], "unknown_token");
    let e = sidecar.request_err("classes.deleteConfirm", json!({ "token": token }));
    assert_eq!(e["code"], "bad_params");

    let cancelled = sidecar.request_ok(
        "classes.deleteConfirm",
        json!({ "token": token, "confirmed": false }),
    );
    assert_eq!(cancelled["cancelled"], true);
    let e = sidecar.request_err(
        "classes.deleteConfirm",
        json!({ "token": token, "confirmed": true }),
    );
    assert_eq!(e["code"], "unknown_token");

    // Asking again replaces the pending token for the same class.
    let stale = sidecar.request_ok("classes.delete", json!({ "id": turma }));
    let intent = sidecar.request_ok("classes.delete", json!({ "id": turma }));
    assert_ne!(stale["token"], intent["token"]);
    let e = sidecar.request_err(
        "classes.deleteConfirm",
        json!({ "token": stale["token"], "confirmed": true }),
    );
    assert_eq!(e["code"], "unknown_token");
    let deleted = sidecar.request_ok(
        "classes.deleteConfirm",
        json!({ "token": intent["token"], "confirmed": true }),
    );
    assert_eq!(deleted["message"], "Turma excluída com sucesso!");
    assert_eq!(deleted["applied"]["record"], turma);

    let rows = sidecar.request_ok("students.list", json!({}));
    assert_eq!(rows["students"][0]["className"], "Turma não encontrada");
    assert_eq!(rows["students"][0]["classFound"], false);

    // A fresh load still shows the orphan.
    sidecar.request_ok("dashboard.refresh", json!({}));
    let rows = sidecar.request_ok("students.list", json!({}));
    assert_eq!(rows["students"].as_array().map(|r| r.len()), Some(1));

    let e = sidecar.request_err("classes.delete", json!({ "id": turma }));
    assert_eq!(e["code"], "not_found");
}

#[test]
fn invalid_input_is_reported_without_touching_the_store() {
    let workspace = tempfile::tempdir().expect("workspace");
    let mut sidecar = Sidecar::spawn();
    sidecar.request_ok(
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );

    let e = sidecar.request_err(
        "classes.create",
        json!({ "grade": "6º Ano", "teacher": "" }),
    );
    assert_eq!(e["code"], "validation_failed");
    assert_eq!(e["details"]["missing"], json!(["name", "teacher"]));
    assert!(e["message"]
        .as_str()
        .expect("message")
        .starts_with("Por favor, preencha todos os campos obrigatórios"));

    let e = sidecar.request_err(
        "students.create",
        json!({ "name": "Ana", "email": "ana@x.com", "classId": 99 }),
    );
    assert_eq!(e["code"], "validation_failed");

    let e = sidecar.request_err(
        "students.create",
        json!({ "name": "Ana", "email": "ana@x.com", "classId": 1, "birthDate": "09/03/2014" }),
    );
    assert_eq!(e["code"], "bad_params");

    let e = sidecar.request_err("classes.update", json!({ "id": 7, "name": "X" }));
    assert_eq!(e["code"], "not_found");
    let e = sidecar.request_err("classes.update", json!({ "id": "abc" }));
    assert_eq!(e["code"], "bad_params");

    let stats = sidecar.request_ok("dashboard.stats", json!({}));
    assert_eq!(stats["totalClasses"], 0);
    assert_eq!(stats["totalStudents"], 0);
}
