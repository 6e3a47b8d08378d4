//! Mapping method declarations onto request templates.
//!
//! [`DefaultContract`] validates every declaration of an interface up front,
//! at bind time, and turns each into a [`MethodMetadata`] that can expand call
//! arguments into a [`RequestTemplate`] without further checks.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::endpoint::config_key;
use crate::{
    CommandKey, ConfigError, Contract, EncodeError, Encoder, HttpMethod, InterfaceDescriptor,
    MethodDescriptor, MethodSignature, ParamBinding, ParamDescriptor, RequestTemplate,
};

/// One segment of a declared path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    Literal(String),
    /// Filled from the argument at this position.
    Argument(usize),
}

/// A validated, ready-to-expand method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMetadata {
    command_key: CommandKey,
    signature: MethodSignature,
    method: HttpMethod,
    path: Vec<PathPart>,
    headers: Vec<(String, String)>,
    params: Vec<ParamDescriptor>,
    return_type: Option<String>,
}

impl MethodMetadata {
    pub fn command_key(&self) -> &CommandKey {
        &self.command_key
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn http_method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &[PathPart] {
        &self.path
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    /// Expands positional `args` into a request template.
    ///
    /// Null path arguments are an error; null query and header arguments are
    /// omitted; a null body sends no body. Array query arguments repeat the key.
    pub fn build_template(
        &self,
        args: &[Value],
        encoder: &dyn Encoder,
    ) -> Result<RequestTemplate, EncodeError> {
        if args.len() != self.params.len() {
            return Err(EncodeError::new(format!(
                "expected {} argument(s), got {}",
                self.params.len(),
                args.len()
            )));
        }

        let mut template = RequestTemplate::new(self.method);
        for part in &self.path {
            match part {
                PathPart::Literal(segment) => template.push_segment(segment.clone()),
                PathPart::Argument(index) => {
                    let value = &args[*index];
                    if value.is_null() {
                        return Err(EncodeError::new(format!(
                            "path argument {index} must not be null"
                        )));
                    }
                    template.push_segment(scalar_text(value));
                }
            }
        }

        for (name, value) in &self.headers {
            template.headers_mut().append(name, value.clone());
        }

        for (param, value) in self.params.iter().zip(args) {
            match &param.binding {
                ParamBinding::Path(_) => {}
                ParamBinding::Query(name) => match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        for item in items.iter().filter(|v| !v.is_null()) {
                            template.add_query(name.clone(), scalar_text(item));
                        }
                    }
                    other => template.add_query(name.clone(), scalar_text(other)),
                },
                ParamBinding::Header(name) => {
                    if !value.is_null() {
                        template.set_header(name, scalar_text(value));
                    }
                }
                ParamBinding::Body => {
                    if !value.is_null() {
                        encoder.encode(value, &mut template)?;
                    }
                }
            }
        }
        Ok(template)
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The contract used when none is configured.
///
/// Each method needs a request line `"VERB /path"`. Placeholders (`{name}`)
/// must span whole path segments and be bound by exactly one `Path` parameter;
/// at most one parameter may be the body; header lines must read `Name: value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContract;

impl Contract for DefaultContract {
    fn parse_and_validate(
        &self,
        interface: &InterfaceDescriptor,
    ) -> Result<Vec<MethodMetadata>, ConfigError> {
        let mut seen = HashSet::new();
        let mut parsed = Vec::with_capacity(interface.methods().len());
        for method in interface.methods() {
            let signature = method.signature();
            let command_key = config_key(interface.name(), &signature);
            if !seen.insert(command_key.clone()) {
                return Err(ConfigError::DuplicateMethod { command_key });
            }
            parsed.push(parse_method(command_key, signature, method)?);
        }
        Ok(parsed)
    }
}

fn parse_method(
    command_key: CommandKey,
    signature: MethodSignature,
    method: &MethodDescriptor,
) -> Result<MethodMetadata, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidMethod {
        command_key: command_key.clone(),
        message,
    };

    let line = method
        .request_line_str()
        .ok_or_else(|| invalid("missing request line".to_string()))?;
    let mut tokens = line.split_whitespace();
    let (Some(verb), Some(raw_path), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(invalid(format!("request line '{line}' must read 'VERB /path'")));
    };
    let http_method = verb.parse::<HttpMethod>().map_err(|e| invalid(e.to_string()))?;
    if !raw_path.starts_with('/') || raw_path.contains('?') {
        return Err(invalid(format!(
            "path '{raw_path}' must start with '/' and carry no query string"
        )));
    }

    let mut path_args: HashMap<&str, usize> = HashMap::new();
    let mut bodies = 0usize;
    for (index, param) in method.params().iter().enumerate() {
        if param.type_name.trim().is_empty() {
            return Err(invalid(format!("parameter {index} has no type")));
        }
        match &param.binding {
            ParamBinding::Path(name) => {
                if path_args.insert(name.as_str(), index).is_some() {
                    return Err(invalid(format!("path parameter '{name}' bound twice")));
                }
            }
            ParamBinding::Body => bodies += 1,
            ParamBinding::Query(name) | ParamBinding::Header(name) if name.is_empty() => {
                return Err(invalid(format!("parameter {index} has an empty name")));
            }
            _ => {}
        }
    }
    if bodies > 1 {
        return Err(invalid("method has more than one body parameter".to_string()));
    }

    let mut path = Vec::new();
    let mut used = HashSet::new();
    for segment in raw_path.split('/').filter(|s| !s.is_empty()) {
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
                let index = *path_args
                    .get(name)
                    .ok_or_else(|| invalid(format!("placeholder '{{{name}}}' is not bound")))?;
                used.insert(name);
                path.push(PathPart::Argument(index));
            }
            _ if segment.contains(['{', '}']) => {
                return Err(invalid(format!(
                    "segment '{segment}': placeholders must span a whole path segment"
                )));
            }
            _ => path.push(PathPart::Literal(segment.to_string())),
        }
    }
    if let Some(unused) = path_args.keys().find(|name| !used.contains(*name)) {
        return Err(invalid(format!(
            "path parameter '{unused}' has no placeholder in '{raw_path}'"
        )));
    }

    let mut headers = Vec::with_capacity(method.headers().len());
    for header in method.headers() {
        match header.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
            _ => return Err(invalid(format!("header '{header}' must read 'Name: value'"))),
        }
    }

    Ok(MethodMetadata {
        command_key,
        signature,
        method: http_method,
        path,
        headers,
        params: method.params().to_vec(),
        return_type: method.return_type().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{InterfaceName, JsonEncoder, MethodName};

    fn method(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(MethodName::new(name).unwrap())
    }

    fn parse_one(m: MethodDescriptor) -> Result<MethodMetadata, ConfigError> {
        let interface = InterfaceDescriptor::new(InterfaceName::new("Vehicles").unwrap()).method(m);
        DefaultContract
            .parse_and_validate(&interface)
            .map(|mut all| all.remove(0))
    }

    #[test]
    fn expands_path_query_header_and_body() {
        let meta = parse_one(
            method("update")
                .request_line("PUT /vehicles/{id}/params")
                .header("Accept: application/json")
                .path_param("id", "i64")
                .query_param("tag", "Vec<String>")
                .header_param("X-Trace", "String")
                .body("ParamDto"),
        )
        .unwrap();

        let template = meta
            .build_template(
                &[json!(42), json!(["a", "b"]), json!("t-1"), json!({"code": "SPEED"})],
                &JsonEncoder::default(),
            )
            .unwrap();

        assert_eq!(template.method(), HttpMethod::Put);
        assert_eq!(template.path_segments(), ["vehicles", "42", "params"]);
        assert_eq!(
            template.query(),
            [("tag".to_string(), "a".to_string()), ("tag".to_string(), "b".to_string())]
        );
        assert_eq!(template.headers().get("accept"), Some("application/json"));
        assert_eq!(template.headers().get("x-trace"), Some("t-1"));
        assert!(template.body().is_some());
    }

    #[test]
    fn null_optional_arguments_are_omitted() {
        let meta = parse_one(
            method("list")
                .request_line("GET /vehicles")
                .query_param("since", "Option<String>")
                .body("Option<Filter>"),
        )
        .unwrap();
        let template = meta
            .build_template(&[Value::Null, Value::Null], &JsonEncoder::default())
            .unwrap();
        assert!(template.query().is_empty());
        assert!(template.body().is_none());
    }

    #[test]
    fn null_path_argument_is_an_encode_error() {
        let meta = parse_one(method("get").request_line("GET /v/{id}").path_param("id", "i64"))
            .unwrap();
        assert!(meta.build_template(&[Value::Null], &JsonEncoder::default()).is_err());
    }

    #[test]
    fn wrong_arity_is_an_encode_error() {
        let meta = parse_one(method("list").request_line("GET /vehicles")).unwrap();
        assert!(meta.build_template(&[json!(1)], &JsonEncoder::default()).is_err());
    }

    #[test]
    fn rejects_missing_or_malformed_request_lines() {
        assert!(parse_one(method("a")).is_err());
        assert!(parse_one(method("a").request_line("GET")).is_err());
        assert!(parse_one(method("a").request_line("FETCH /x")).is_err());
        assert!(parse_one(method("a").request_line("GET x")).is_err());
        assert!(parse_one(method("a").request_line("GET /x?y=1")).is_err());
    }

    #[test]
    fn rejects_unbound_placeholders_and_orphan_path_params() {
        assert!(parse_one(method("a").request_line("GET /v/{id}")).is_err());
        assert!(parse_one(method("a").request_line("GET /v").path_param("id", "i64")).is_err());
        assert!(parse_one(
            method("a")
                .request_line("GET /v/id-{id}")
                .path_param("id", "i64")
        )
        .is_err());
    }

    #[test]
    fn rejects_two_bodies_and_bad_headers() {
        assert!(parse_one(method("a").request_line("POST /v").body("A").body("B")).is_err());
        assert!(parse_one(method("a").request_line("GET /v").header("NoColon")).is_err());
    }

    #[test]
    fn rejects_duplicate_declarations() {
        let interface = InterfaceDescriptor::new(InterfaceName::new("Vehicles").unwrap())
            .method(method("list").request_line("GET /a"))
            .method(method("list").request_line("GET /b"));
        assert!(matches!(
            DefaultContract.parse_and_validate(&interface),
            Err(ConfigError::DuplicateMethod { .. })
        ));
    }
}
