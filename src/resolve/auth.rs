//! Authorization resolution: gates, per-entity policies and form requests.

use crate::case::to_studly_case;
use crate::config::{AuthorizeConfig, PolicyConfig};
use crate::error::ScaffoldError;
use crate::ir::{Form, FormAuthorization, Gate, Method, Policy, POLICY_ACTIONS};
use crate::resolve::ResolutionContext;
use indexmap::IndexMap;

const FORM_SUFFIX: &str = "Request";

pub fn resolve_auth(ctx: &mut ResolutionContext<'_>) -> Result<(), ScaffoldError> {
    let doc = ctx.document;
    let section = &doc.auth;

    for (ability, handler) in &section.gates {
        ctx.gates.insert(ability.clone(), Gate::new(ability, handler.as_deref()));
    }

    for (name, config) in &section.policies {
        let owner = format!("policies.{}", name);
        let actions: Vec<String> = match config {
            Some(PolicyConfig::Toggle(false)) => {
                tracing::debug!(policy = %name, "policy disabled");
                continue;
            }
            None | Some(PolicyConfig::Toggle(true)) => POLICY_ACTIONS.iter().map(|a| a.to_string()).collect(),
            Some(PolicyConfig::Actions(words)) => {
                let granted = words.to_vec();
                if let Some(unknown) = granted.iter().find(|a| !POLICY_ACTIONS.contains(&a.as_str())) {
                    return Err(ScaffoldError::missing("policy action", unknown.clone(), owner));
                }
                POLICY_ACTIONS
                    .iter()
                    .filter(|a| granted.iter().any(|g| g == *a))
                    .map(|a| a.to_string())
                    .collect()
            }
        };
        let entity = ctx.entity(name, &owner)?;
        let policy = Policy {
            entity: entity.key.clone(),
            class: format!("{}Policy", entity.class),
            actions,
        };
        ctx.policies.insert(policy.entity.clone(), policy);
    }

    for (name, config) in &section.forms {
        let owner = format!("forms.{}", name);
        let studly = to_studly_case(name);
        let class = if studly.ends_with(FORM_SUFFIX) {
            studly
        } else {
            format!("{}{}", studly, FORM_SUFFIX)
        };
        let authorize = match config.as_ref().and_then(|c| c.authorize.as_ref()) {
            None | Some(AuthorizeConfig::Toggle(true)) => FormAuthorization::Allow,
            Some(AuthorizeConfig::Toggle(false)) => FormAuthorization::Deny,
            Some(AuthorizeConfig::Line(ability)) => {
                let ability = ability.trim();
                let known = ctx.gates.contains_key(ability) || ctx.policies.values().any(|p| p.allows(ability));
                if !known {
                    return Err(ScaffoldError::missing("ability", ability, format!("{}.authorize", owner)));
                }
                FormAuthorization::Ability {
                    ability: ability.to_string(),
                }
            }
        };
        let rules: IndexMap<String, Vec<Method>> = config
            .as_ref()
            .map(|c| {
                c.rules
                    .iter()
                    .map(|(field, rules)| {
                        let methods: Vec<Method> = rules.to_vec().iter().map(|r| Method::parse(r)).collect();
                        (field.clone(), methods)
                    })
                    .collect()
            })
            .unwrap_or_default();
        ctx.forms.insert(
            name.clone(),
            Form {
                name: name.clone(),
                class,
                authorize,
                rules,
            },
        );
    }
    Ok(())
}
