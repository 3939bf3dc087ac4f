/// Structural violations of the constructor spec, detected without touching any
/// provider or repository. Mirrors the `InvalidSpec` error kind.
#[derive(Debug, thiserror::Error)]
pub enum InvalidSpec {
    #[error("element `{element}` of component `{component}` has both `access` and `input` set")]
    BothAccessAndInput { component: String, element: String },

    #[error("element `{element}` of component `{component}` has neither `access` nor `input` set")]
    NeitherAccessNorInput { component: String, element: String },

    #[error(
        "element `{element}` of component `{component}` sets copyPolicy=byValue on an `input`; \
         byValue is only legal with `access`"
    )]
    ByValueWithInput { component: String, element: String },

    #[error(
        "element `{element}` of component `{component}` sets a non-empty copyPolicy `{policy}` on an `input`"
    )]
    NonEmptyPolicyWithInput {
        component: String,
        element: String,
        policy: String,
    },

    #[error("component `{0}` is malformed: {1}")]
    MalformedComponent(String, String),
}
