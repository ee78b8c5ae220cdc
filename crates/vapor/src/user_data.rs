//! instance user data
//!
//! User data is a script (or a multipart message of several) handed to the instance at boot.
//! Scripts usually need values only known at deploy time, like the stack id or the region. These
//! are written as `{{ name }}` placeholders and replaced by [inject_params] with arbitrary
//! [Value]s. The result stays a list of fragments and is wrapped in `Fn::Join` and `Fn::Base64`,
//! so the provisioning engine resolves the intrinsic values.
use crate::intrinsics;
use crate::value::{Object, Value};
use std::path::Path;

const BOUNDARY: &str = "===============vapor-user-data==";

/// Replace `{{ name }}` placeholders with values from `params`
///
/// The text is split into lines and every line keeps (or gets) a trailing `\n`. Placeholders must
/// be written exactly as `{{ name }}`: one space inside each pair of braces. Anything else, as well
/// as placeholders without a matching param, is left as-is. The literal before a placeholder is
/// always emitted, even when it is empty.
///
/// ```
/// # use vapor::{user_data::inject_params, value::{Object, Value}};
/// let mut params = Object::new();
/// params.insert("name".into(), "world".into());
///
/// assert_eq!(
///     inject_params("hello {{ name }}!", &params),
///     [Value::from("hello "), "world".into(), "!\n".into()]
/// );
/// ```
pub fn inject_params(text: &str, params: &Object) -> Vec<Value> {
    let mut fragments = vec![];
    for line in text.split('\n') {
        let line = format!("{line}\n");
        substitute_line(&line, params, &mut fragments);
    }

    fragments
}

fn substitute_line(line: &str, params: &Object, fragments: &mut Vec<Value>) {
    let mut literal_start = 0;
    let mut search_from = 0;

    while let Some(offset) = line[search_from..].find("{{ ") {
        let start = search_from + offset;
        let placeholder = params.iter().find_map(|(name, value)| {
            let placeholder = format!("{{{{ {name} }}}}");
            line[start..]
                .starts_with(&placeholder)
                .then_some((placeholder.len(), value))
        });

        match placeholder {
            Some((len, value)) => {
                fragments.push(line[literal_start..start].into());
                fragments.push(value.clone());
                search_from = start + len;
                literal_start = search_from;
            }
            // `{` is a single byte, so this stays on a char boundary
            None => search_from = start + 1,
        }
    }

    fragments.push(line[literal_start..].into());
}



/// Value of the `UserData` property of an instance
#[derive(Debug, Clone, PartialEq)]
pub struct UserData(Value);

impl UserData {
    /// Join `fragments` and base64 encode them
    pub fn of(fragments: Vec<Value>) -> Self {
        Self(intrinsics::base64(intrinsics::join("", fragments)))
    }

    /// Inject `params` into `text`, see [inject_params]
    pub fn from_text(text: &str, params: &Object) -> Self {
        Self::of(inject_params(text, params))
    }

    /// Combine files into a multipart message and inject `params`
    ///
    /// Each file comes with the MIME subtype of its part, e.g. `x-shellscript` or `cloud-config`.
    pub fn from_files<P: AsRef<Path>>(
        files: &[(P, &str)],
        params: &Object,
    ) -> std::io::Result<Self> {
        let mut parts = Vec::with_capacity(files.len());
        for (path, subtype) in files {
            let path = path.as_ref();
            tracing::debug!(path = %path.display(), subtype, "reading user data part");
            let contents = std::fs::read_to_string(path)?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            parts.push(Part {
                filename,
                subtype: subtype.to_string(),
                contents,
            });
        }

        Ok(Self::from_text(&multipart(&parts), params))
    }
}

impl From<UserData> for Value {
    fn from(value: UserData) -> Self {
        value.0
    }
}

/// One attachment of a multipart user data message
#[derive(Debug, Clone, derive_new::new)]
pub struct Part {
    pub filename: String,
    pub subtype: String,
    pub contents: String,
}

/// Render a `multipart/mixed` message as understood by cloud-init
pub fn multipart(parts: &[Part]) -> String {
    let mut message = format!(
        "Content-Type: multipart/mixed; boundary=\"{BOUNDARY}\"\nMIME-Version: 1.0\n\n"
    );

    for part in parts {
        message.push_str(&format!(
            "--{BOUNDARY}\n\
             Content-Type: text/{}; charset=\"us-ascii\"\n\
             MIME-Version: 1.0\n\
             Content-Transfer-Encoding: 7bit\n\
             Content-Disposition: attachment; filename=\"{}\"\n\n",
            part.subtype, part.filename
        ));
        message.push_str(&part.contents);
        if !part.contents.ends_with('\n') {
            message.push('\n');
        }
    }

    message.push_str(&format!("--{BOUNDARY}--\n"));
    message
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::intrinsics::Pseudo;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "abcde\n__{{ fghij }}__\nklmno\n";

    fn params(entries: &[(&str, Value)]) -> Object {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<Value> {
        values.iter().copied().map(Value::from).collect()
    }

    #[test]
    fn all_placeholders_replaced() {
        let fragments = inject_params(TEXT, &params(&[("fghij", "X".into())]));
        assert_eq!(fragments, strings(&["abcde\n", "__", "X", "__\n", "klmno\n", "\n"]));
    }

    #[test]
    fn unresolved_placeholder_is_kept() {
        let fragments = inject_params(TEXT, &Object::new());
        assert_eq!(
            fragments,
            strings(&["abcde\n", "__{{ fghij }}__\n", "klmno\n", "\n"])
        );
    }

    #[test]
    fn malformed_placeholders_are_kept() {
        let params = params(&[("fghij", "X".into())]);
        for malformed in [
            "{{fghij }}",
            "{{ fghij}}",
            "{{fghij}}",
            "{ { fghij }}",
            "{{ fghij } }",
        ] {
            let text = format!("__{malformed}__");
            assert_eq!(
                inject_params(&text, &params),
                strings(&[format!("{text}\n").as_str()]),
                "{malformed}"
            );
        }
    }

    #[test]
    fn multiple_placeholders_in_one_line() {
        let fragments = inject_params(
            "abcde__{{ fghij }}__{{ klmno }}__pqrst",
            &params(&[("fghij", "F".into()), ("klmno", "K".into())]),
        );
        assert_eq!(fragments, strings(&["abcde__", "F", "__", "K", "__pqrst\n"]));
    }

    #[test]
    fn literal_before_placeholder_is_kept_when_empty() {
        let fragments = inject_params(
            "{{ a }}{{ b }}",
            &params(&[("a", "A".into()), ("b", "B".into())]),
        );
        assert_eq!(fragments, strings(&["", "A", "", "B", "\n"]));
    }

    #[test]
    fn placeholder_after_unknown_one() {
        let fragments = inject_params(
            "{{ unknown }} {{ region }}",
            &params(&[("region", Pseudo::Region.into())]),
        );
        assert_eq!(
            fragments,
            vec![
                Value::from("{{ unknown }} "),
                Pseudo::Region.into(),
                "\n".into()
            ]
        );
    }

    #[test]
    fn user_data_is_base64_of_join() {
        let user_data = UserData::from_text(
            "--stack {{ stack_id }}",
            &params(&[("stack_id", Pseudo::StackId.into())]),
        );

        assert_eq!(
            serde_json::to_value(Value::from(user_data)).unwrap(),
            serde_json::json!({
                "Fn::Base64": { "Fn::Join": ["", ["--stack ", { "Ref": "AWS::StackId" }, "\n"]] }
            })
        );
    }

    #[test]
    fn user_data_from_files() {
        let directory = std::env::temp_dir().join(format!("vapor-user-data-{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let script = directory.join("bootstrap.sh");
        let cloud_config = directory.join("cloud.yml");
        std::fs::write(&script, "#!/bin/bash\ncfn-init --stack {{ stack_id }}\n").unwrap();
        std::fs::write(&cloud_config, "#cloud-config\n").unwrap();

        let user_data = UserData::from_files(
            &[(&script, "x-shellscript"), (&cloud_config, "cloud-config")],
            &params(&[("stack_id", Pseudo::StackId.into())]),
        )
        .unwrap();
        std::fs::remove_dir_all(&directory).unwrap();

        let Value::Call(base64) = Value::from(user_data) else {
            panic!("user data must be a function call");
        };
        assert_eq!(base64.function(), "Base64");
        let [Value::Call(join)] = base64.args() else {
            panic!("Fn::Base64 takes the joined fragments");
        };
        assert_eq!(join.function(), "Join");
        let [Value::String(delimiter), Value::Array(fragments)] = join.args() else {
            panic!("Fn::Join takes a delimiter and a list");
        };
        assert_eq!(delimiter, "");

        let position = fragments
            .iter()
            .position(|fragment| fragment == &Value::from(Pseudo::StackId))
            .unwrap();
        assert_eq!(
            fragments[position - 1],
            Value::from("cfn-init --stack ")
        );

        let message: String = fragments.iter().filter_map(Value::as_str).collect();
        assert!(message.starts_with("Content-Type: multipart/mixed;"));
        assert!(message.contains(
            "filename=\"bootstrap.sh\"\n\n#!/bin/bash\ncfn-init --stack \n"
        ));
        assert!(message.contains("filename=\"cloud.yml\"\n\n#cloud-config\n"));
        assert!(message.ends_with(&format!("--{BOUNDARY}--\n\n")));
    }

    #[test]
    fn multipart_message() {
        let message = multipart(&[
            Part::new("run.sh".into(), "x-shellscript".into(), "#!/bin/bash\n".into()),
            Part::new("cloud.yml".into(), "cloud-config".into(), "#cloud-config".into()),
        ]);

        assert!(message.starts_with("Content-Type: multipart/mixed;"));
        assert!(message.contains(
            "Content-Type: text/x-shellscript; charset=\"us-ascii\"\nMIME-Version: 1.0\nContent-Transfer-Encoding: 7bit\nContent-Disposition: attachment; filename=\"run.sh\"\n\n#!/bin/bash\n--"
        ));
        assert!(message.contains("filename=\"cloud.yml\"\n\n#cloud-config\n--"));
        assert!(message.ends_with(&format!("--{BOUNDARY}--\n")));
    }
}
