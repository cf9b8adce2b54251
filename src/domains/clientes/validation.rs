// ============================================================================
// CLIENTE FIELD VALIDATION
// ============================================================================
//
// Invalid fields never block a write: every finding is collected into the
// record's `Errores` map, keyed by API field name.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::Errores;

lazy_static! {
    static ref NOMBRE_REGEX: Regex =
        Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑüÜ]+(\s[a-zA-ZáéíóúÁÉÍÓÚñÑüÜ]+)*$").unwrap();
    static ref SPECIAL_CHARS_REGEX: Regex =
        Regex::new(r#"[!@#$%^&*()_+=\[\]{};':"\\|,.<>/?~`0-9]"#).unwrap();
    static ref INJECTION_REGEX: Regex = Regex::new(
        r"(?i)(union|select|insert|update|delete|drop|create|alter|exec|script|javascript|<script|onload|onerror|alert\(|confirm\(|prompt\()"
    )
    .unwrap();

    /// Chiapas area codes: 916-919, 932, 934, 961-968, 992, 994
    static ref CELULAR_REGEX: Regex = Regex::new(r"^(91[6-9]|93[24]|96[1-8]|99[24])[0-9]{7}$").unwrap();
    static ref TRIVIAL_PHONE_REGEX: Regex = Regex::new(
        r"^(0000000000|1111111111|2222222222|3333333333|4444444444|5555555555|6666666666|7777777777|8888888888|9999999999|1234567890|0987654321)$"
    )
    .unwrap();

    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9._-]*[a-zA-Z0-9])?@(gmail\.com|hotmail\.com|yahoo\.com|outlook\.com|live\.com|icloud\.com|protonmail\.com|aol\.com|msn\.com|gmx\.com|ymail\.com|me\.com|mail\.com|zoho\.com|edu\.mx|edu\.com|edu\.org|institucional\.edu\.mx|unach\.mx|unicach\.mx)$"
    )
    .unwrap();
    static ref DISPOSABLE_EMAIL_REGEX: Regex =
        Regex::new(r"@(10minutemail|guerrillamail|mailinator|tempmail|throwaway|yopmail|maildrop|trashmail)\.").unwrap();
}

const INSTITUTIONAL_DOMAINS: [&str; 4] = ["edu.mx", "institucional.edu.mx", "unach.mx", "unicach.mx"];

/// Contact fields of a cliente, as validated before every write
#[derive(Debug, Clone, Validate)]
pub struct ContactoCliente {
    #[validate(custom(function = "validate_nombre"))]
    pub nombre: String,
    #[validate(custom(function = "validate_celular"))]
    pub celular: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
}

impl ContactoCliente {
    pub fn new(nombre: &str, celular: &str, email: &str) -> Self {
        Self {
            nombre: nombre.trim().to_string(),
            celular: celular.trim().to_string(),
            email: email.trim().to_string(),
        }
    }

    /// `None` when every field is valid
    pub fn errores(&self) -> Option<Errores> {
        match self.validate() {
            Ok(()) => None,
            Err(report) => Some(errores_from_report(&report)).filter(|e| !e.is_empty()),
        }
    }
}

fn api_field_name(field: &str) -> String {
    match field {
        "nombre" => "Nombre".to_string(),
        "celular" => "Celular".to_string(),
        "email" => "Email".to_string(),
        other => other.to_string(),
    }
}

fn errores_from_report(report: &ValidationErrors) -> Errores {
    let mut errores = Errores::new();
    for (field, errors) in report.field_errors() {
        let field: &str = &field;
        let messages = errores.entry(api_field_name(field)).or_default();
        for error in errors.iter() {
            match error.params.get("findings").and_then(|v| v.as_array()) {
                Some(findings) => {
                    messages.extend(findings.iter().filter_map(|f| f.as_str()).map(str::to_string));
                }
                None => messages.push(
                    error.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| error.code.to_string()),
                ),
            }
        }
    }
    errores
}

/// Packs every finding of one field into a single validator error
fn findings_error(code: &'static str, findings: Vec<String>) -> Result<(), ValidationError> {
    let Some(first) = findings.first().cloned() else {
        return Ok(());
    };
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(first));
    error.add_param(Cow::from("findings"), &findings);
    Err(error)
}

// ============================================================================
// FIELD RULES
// ============================================================================

fn validate_nombre(nombre: &str) -> Result<(), ValidationError> {
    findings_error("nombre", nombre_findings(nombre))
}

fn validate_celular(celular: &str) -> Result<(), ValidationError> {
    findings_error("celular", celular_findings(celular))
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    findings_error("email", email_findings(email))
}

pub fn nombre_findings(nombre: &str) -> Vec<String> {
    let nombre = nombre.trim();
    if nombre.is_empty() {
        return vec!["El campo Nombre es obligatorio".to_string()];
    }

    let mut findings = Vec::new();
    let chars = nombre.chars().count();
    if chars < 2 {
        findings.push("El Nombre debe tener al menos 2 caracteres".to_string());
    }
    if chars > 100 {
        findings.push("El Nombre no puede exceder 100 caracteres".to_string());
    }
    if !NOMBRE_REGEX.is_match(nombre) {
        findings.push("El Nombre solo puede contener letras, acentos y un espacio entre palabras".to_string());
    }
    if SPECIAL_CHARS_REGEX.is_match(nombre) {
        findings.push("El Nombre no puede contener números ni caracteres especiales".to_string());
    }
    if nombre.contains("  ") {
        findings.push("No se permiten espacios múltiples consecutivos".to_string());
    }
    if INJECTION_REGEX.is_match(nombre) {
        findings.push("El Nombre contiene caracteres o patrones no permitidos".to_string());
    }
    if !nombre.chars().any(char::is_alphabetic) {
        findings.push("El Nombre debe contener al menos una letra".to_string());
    }
    if nombre.chars().filter(|c| !c.is_whitespace()).count() < 2 {
        findings.push("El Nombre debe tener al menos 2 letras (sin contar espacios)".to_string());
    }
    findings
}

pub fn celular_findings(celular: &str) -> Vec<String> {
    let celular = celular.trim();
    if celular.is_empty() {
        return vec!["El campo Celular es obligatorio".to_string()];
    }

    let mut findings = Vec::new();
    let len = celular.chars().count();
    if len < 10 {
        findings.push("El número de celular debe tener exactamente 10 dígitos (faltan dígitos)".to_string());
    } else if len > 10 {
        findings.push("El número de celular debe tener exactamente 10 dígitos (demasiados dígitos)".to_string());
    }
    if !celular.chars().all(|c| c.is_ascii_digit()) {
        findings.push("El número de celular solo puede contener dígitos".to_string());
    }
    if !CELULAR_REGEX.is_match(celular) {
        findings.push(
            "El número debe corresponder a una lada válida de Chiapas (916-919, 932, 934, 961-968, 992, 994)"
                .to_string(),
        );
    }
    if TRIVIAL_PHONE_REGEX.is_match(celular) {
        findings.push("El número de celular no puede ser un patrón repetitivo o secuencial".to_string());
    }
    if celular.starts_with('0') {
        findings.push("El número de celular no puede empezar con 0".to_string());
    }

    if len == 10 && celular.is_ascii() {
        let lada = &celular[..3];
        let fourth = celular.as_bytes()[3];
        match lada {
            "916" | "917" | "918" | "919" if fourth == b'0' || fourth == b'1' => {
                findings.push(format!("Formato inválido para la lada {} de Tuxtla Gutiérrez", lada));
            }
            "932" | "934" if fourth == b'0' => {
                findings.push(format!("Formato inválido para la lada {}", lada));
            }
            _ => {}
        }
    }
    findings
}

pub fn email_findings(email: &str) -> Vec<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return vec!["El campo Email es obligatorio".to_string()];
    }

    let mut findings = Vec::new();
    if email.len() < 5 {
        findings.push("El Email debe tener al menos 5 caracteres".to_string());
    }
    if email.len() > 254 {
        findings.push("El Email no puede exceder 254 caracteres (límite RFC)".to_string());
    }

    let parts: Vec<&str> = email.split('@').collect();
    if let [local, domain] = parts.as_slice() {
        if local.is_empty() {
            findings.push("La parte antes del @ no puede estar vacía".to_string());
        } else if local.len() > 64 {
            findings.push("La parte antes del @ no puede exceder 64 caracteres".to_string());
        }
        if local.starts_with('.') || local.ends_with('.') {
            findings.push("El Email no puede empezar o terminar con punto antes del @".to_string());
        }
        if local.contains("..") {
            findings.push("El Email no puede tener puntos consecutivos".to_string());
        }
        if domain.is_empty() {
            findings.push("La parte después del @ no puede estar vacía".to_string());
        } else if domain.len() > 253 {
            findings.push("El dominio no puede exceder 253 caracteres".to_string());
        }
        if INSTITUTIONAL_DOMAINS.contains(domain) && local.len() < 3 {
            findings.push("Los emails institucionales deben tener al menos 3 caracteres antes del @".to_string());
        }
    } else {
        findings.push("El Email debe tener exactamente un símbolo @".to_string());
    }

    if !EMAIL_REGEX.is_match(&email) {
        findings.push(
            "El Email debe usar un dominio permitido (gmail.com, hotmail.com, yahoo.com, outlook.com, institucional.edu.mx, etc.)"
                .to_string(),
        );
    }
    if DISPOSABLE_EMAIL_REGEX.is_match(&email) {
        findings.push("No se permiten emails temporales o desechables".to_string());
    }
    if INJECTION_REGEX.is_match(&email) {
        findings.push("El Email contiene caracteres o patrones no permitidos".to_string());
    }
    if email.starts_with(&['.', '-', '_'][..]) {
        findings.push("El Email no puede empezar con punto, guión o guión bajo".to_string());
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_contact_has_no_errores() {
        let contacto = ContactoCliente::new("Pedro Pérez", "9613214782", "pedro@gmail.com");
        assert_eq!(contacto.errores(), None);
    }

    #[test]
    fn test_all_findings_are_collected_per_field() {
        let contacto = ContactoCliente::new("P3dro", "12345", "pedro@example.com");
        let errores = contacto.errores().unwrap();

        let nombre = &errores["Nombre"];
        assert!(nombre.contains(&"El Nombre no puede contener números ni caracteres especiales".to_string()));
        assert!(nombre.len() >= 2);

        let celular = &errores["Celular"];
        assert!(celular[0].contains("faltan dígitos"));
        assert!(celular.iter().any(|m| m.contains("lada válida de Chiapas")));

        assert!(errores["Email"].iter().any(|m| m.contains("dominio permitido")));
    }

    #[test]
    fn test_missing_fields_are_required() {
        let errores = ContactoCliente::new("", " ", "").errores().unwrap();
        assert_eq!(errores["Nombre"], vec!["El campo Nombre es obligatorio".to_string()]);
        assert_eq!(errores["Celular"], vec!["El campo Celular es obligatorio".to_string()]);
        assert_eq!(errores["Email"], vec!["El campo Email es obligatorio".to_string()]);
    }

    #[test]
    fn test_celular_rules() {
        assert!(celular_findings("9613214782").is_empty());
        assert!(celular_findings("9921234567").is_empty());
        assert!(celular_findings("5512345678").iter().any(|m| m.contains("Chiapas")));
        assert!(celular_findings("1234567890").iter().any(|m| m.contains("repetitivo")));
        assert!(celular_findings("9160123456").iter().any(|m| m.contains("Tuxtla")));
        assert!(celular_findings("9320123456").iter().any(|m| m.contains("lada 932")));
        assert!(celular_findings("96132147ab").iter().any(|m| m.contains("solo puede contener dígitos")));
    }

    #[test]
    fn test_email_rules() {
        assert!(email_findings("Ana.Lopez@Hotmail.com").is_empty());
        assert!(email_findings("ana@mailinator.com").iter().any(|m| m.contains("desechables")));
        assert!(email_findings("a@b@gmail.com").iter().any(|m| m.contains("exactamente un símbolo")));
        assert!(email_findings("an..a@gmail.com").iter().any(|m| m.contains("consecutivos")));
        assert!(email_findings("ab@unach.mx").iter().any(|m| m.contains("institucionales")));
    }

    #[test]
    fn test_nombre_rules() {
        assert!(nombre_findings("María José").is_empty());
        assert!(nombre_findings("A").iter().any(|m| m.contains("al menos 2 caracteres")));
        assert!(nombre_findings("Ana  Luz").iter().any(|m| m.contains("espacios múltiples")));
        assert!(nombre_findings("drop table").iter().any(|m| m.contains("patrones no permitidos")));
    }
}
