// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Binds parsed statements into symbol and rule tables.
//!
//! Statements are applied in three passes, so that a name may be used before the statement
//! that declares it: [`Pass::Declare`] creates every symbol, [`Pass::Attach`] attaches aliases,
//! attributes, class definitions and level declarations to them, and [`Pass::Bind`] expands and
//! records rules, role and user definitions, and labeling statements. Every cross reference in
//! the resulting tables is an index into the table of the referenced symbol kind.

use super::constraints::{self, ConstraintTerm, CEXPR_SYM_ROLE, CEXPR_SYM_TYPE, CEXPR_SYM_USER};
use super::error::{ParseError, ValidateError};
use super::labeling::FsUseType;
use super::metadata::HandleUnknown;
use super::rules::{CondTerm, DefaultRangeValue, DefaultRuleType, DefaultValue, TeRuleType};
use super::statements::{
    parse_statements, CategorySpec, ContextSpec, LevelSpec, NameSet, RangeSpec, Statement,
    StatementKind, XpermSpec,
};
use super::{LoadOptions, Validate};

use log::warn;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;

/// Policy capabilities known to current kernels.
pub const KNOWN_POLICY_CAPABILITIES: [&str; 14] = [
    "network_peer_controls",
    "open_perms",
    "extended_socket_class",
    "always_check_network",
    "cgroup_seclabel",
    "nnp_nosuid_transition",
    "genfs_seclabel_symlinks",
    "ioctl_skip_cloexec",
    "userspace_initial_context",
    "netlink_xperm",
    "netif_wildcard",
    "genfs_seclabel_wildcard",
    "functionfs_seclabel",
    "memfd_class",
];

/// Number of permission bits in an access vector.
pub const MAX_CLASS_PERMISSIONS: usize = 32;

/// Extended permission kinds accepted by `*xperm` rules.
const XPERM_TYPES: [&str; 2] = ["ioctl", "nlmsg"];

/// Protocols accepted by `portcon`.
const PORTCON_PROTOCOLS: [&str; 4] = ["tcp", "udp", "dccp", "sctp"];

/// The role every policy declares implicitly, for objects.
pub const OBJECT_R: &str = "object_r";

/// The class `role_transition` and `range_transition` apply to when none is given.
const PROCESS_CLASS: &str = "process";

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct CommonDecl {
    pub name: String,
    pub perms: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ClassDecl {
    pub name: String,
    pub common: Option<usize>,
    pub perms: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct InitialSidDecl {
    pub name: String,
    pub context: Option<ContextData>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct RoleDecl {
    pub name: String,
    pub types: BTreeSet<usize>,
}

/// A type or an attribute. Types record the attributes they have; attributes record their
/// members.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct TypeDecl {
    pub name: String,
    pub is_attribute: bool,
    pub aliases: Vec<String>,
    pub attributes: BTreeSet<usize>,
    pub members: BTreeSet<usize>,
    pub permissive: bool,
    pub bounds: Option<usize>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct UserDecl {
    pub name: String,
    pub roles: BTreeSet<usize>,
    pub level: Option<LevelData>,
    pub range: Option<RangeData>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct BooleanDecl {
    pub name: String,
    pub state: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct SensitivityDecl {
    pub name: String,
    pub aliases: Vec<String>,
    /// Rank in the dominance order.
    pub value: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct CategoryDecl {
    pub name: String,
    pub aliases: Vec<String>,
    /// Position in declaration order, which is also the index of the category.
    pub value: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct PolicyCapDecl {
    pub name: String,
}

/// A sensitivity and a set of categories, sorted by category value.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(super) struct LevelData {
    pub sensitivity: usize,
    pub categories: Vec<usize>,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(super) struct RangeData {
    pub low: LevelData,
    pub high: LevelData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ContextData {
    pub user: usize,
    pub role: usize,
    pub type_: usize,
    pub range: Option<RangeData>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum TeRuleBody {
    Permissions(BTreeSet<String>),
    Xperms { xperm_type: String, xperms: BTreeSet<u16> },
    Default { default: usize, filename: Option<String> },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct TeRuleData {
    pub ruletype: TeRuleType,
    pub source: usize,
    pub target: usize,
    pub class: usize,
    pub body: TeRuleBody,
    /// The conditional expression and branch the rule belongs to.
    pub conditional: Option<(usize, bool)>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum RbacRuleData {
    Allow { source: usize, target: usize },
    Transition { source: usize, target: usize, class: usize, default: usize },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct MlsRuleData {
    pub source: usize,
    pub target: usize,
    pub class: usize,
    pub range: RangeData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct DefaultData {
    pub ruletype: DefaultRuleType,
    pub class: usize,
    pub default: DefaultValue,
    pub range: Option<DefaultRangeValue>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ConstraintData {
    pub validatetrans: bool,
    pub class: usize,
    pub perms: BTreeSet<String>,
    pub terms: Vec<ConstraintTerm>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct FsUseData {
    pub behavior: FsUseType,
    pub fs_type: String,
    pub context: ContextData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct GenfsconData {
    pub fs_type: String,
    pub path: String,
    pub file_type: Option<String>,
    pub context: ContextData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct PortconData {
    pub protocol: String,
    pub low: u16,
    pub high: u16,
    pub context: ContextData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct NetifconData {
    pub interface: String,
    pub context: ContextData,
    pub packet_context: ContextData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct NodeconData {
    pub address: IpAddr,
    pub netmask: IpAddr,
    pub context: ContextData,
}

/// The symbol and rule tables of a source policy, before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedPolicy {
    pub(super) version: u32,
    pub(super) handle_unknown: HandleUnknown,
    pub(super) mls: bool,
    pub(super) policy_capabilities: Vec<PolicyCapDecl>,
    pub(super) commons: Vec<CommonDecl>,
    pub(super) classes: Vec<ClassDecl>,
    pub(super) initial_sids: Vec<InitialSidDecl>,
    pub(super) roles: Vec<RoleDecl>,
    pub(super) types: Vec<TypeDecl>,
    pub(super) users: Vec<UserDecl>,
    pub(super) booleans: Vec<BooleanDecl>,
    pub(super) sensitivities: Vec<SensitivityDecl>,
    pub(super) categories: Vec<CategoryDecl>,
    pub(super) levels: Vec<LevelData>,
    pub(super) conditionals: Vec<Vec<CondTerm>>,
    pub(super) te_rules: Vec<TeRuleData>,
    pub(super) rbac_rules: Vec<RbacRuleData>,
    pub(super) mls_rules: Vec<MlsRuleData>,
    pub(super) constraints: Vec<ConstraintData>,
    pub(super) defaults: Vec<DefaultData>,
    pub(super) fs_uses: Vec<FsUseData>,
    pub(super) genfscons: Vec<GenfsconData>,
    pub(super) portcons: Vec<PortconData>,
    pub(super) netifcons: Vec<NetifconData>,
    pub(super) nodecons: Vec<NodeconData>,
}

impl ParsedPolicy {
    /// Parses and binds the source policy `text`.
    pub(super) fn parse(text: &str, options: &LoadOptions) -> Result<Self, ParseError> {
        let statements = parse_statements(text)?;
        let mut builder = Builder::new(options);
        for pass in [Pass::Declare, Pass::Attach, Pass::Bind] {
            for statement in &statements {
                builder.apply(pass, statement, None)?;
            }
            match pass {
                Pass::Declare => builder.order_sensitivities()?,
                Pass::Attach => builder.collect_attribute_members(),
                Pass::Bind => {}
            }
        }
        Ok(builder.policy)
    }

    /// Permissions of `class`, including those of its common.
    pub(super) fn class_perms(&self, class: usize) -> BTreeSet<&str> {
        let decl = &self.classes[class];
        let mut perms: BTreeSet<&str> = decl.perms.iter().map(String::as_str).collect();
        if let Some(common) = decl.common {
            perms.extend(self.commons[common].perms.iter().map(String::as_str));
        }
        perms
    }

    fn dominates(&self, high: &LevelData, low: &LevelData) -> bool {
        self.sensitivities[high.sensitivity].value >= self.sensitivities[low.sensitivity].value
            && low.categories.iter().all(|c| high.categories.contains(c))
    }
}

impl Validate for ParsedPolicy {
    type Error = ValidateError;

    fn validate(&self) -> Result<(), Self::Error> {
        for constraint in &self.constraints {
            constraints::validate_terms(&constraint.terms).map_err(|source| {
                ValidateError::InvalidConstraint {
                    class: self.classes[constraint.class].name.clone(),
                    source,
                }
            })?;
        }

        for (class, decl) in self.classes.iter().enumerate() {
            let count = self.class_perms(class).len();
            if count > MAX_CLASS_PERMISSIONS {
                return Err(ValidateError::TooManyPermissions {
                    class: decl.name.clone(),
                    count,
                    max: MAX_CLASS_PERMISSIONS,
                });
            }
        }

        if self.mls {
            for user in &self.users {
                match (&user.level, &user.range) {
                    (Some(level), Some(range)) => {
                        if !self.dominates(level, &range.low) || !self.dominates(&range.high, level)
                        {
                            return Err(ValidateError::UserLevelOutsideRange {
                                user: user.name.clone(),
                            });
                        }
                    }
                    _ => return Err(ValidateError::MissingUserMls { user: user.name.clone() }),
                }
            }
        }

        for sid in self.initial_sids.iter().filter(|sid| sid.context.is_none()) {
            warn!("initial SID {} has no context", sid.name);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Pass {
    Declare,
    Attach,
    Bind,
}

/// Identifies rules that the compiled access vector table stores as a single entry.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct RuleKey {
    ruletype: TeRuleType,
    source: usize,
    target: usize,
    class: usize,
    conditional: Option<(usize, bool)>,
    /// The extended permission kind, or the file name of a named type transition.
    qualifier: Option<String>,
}

fn declare(
    map: &mut HashMap<String, usize>,
    line: usize,
    kind: &'static str,
    name: &str,
    value: usize,
) -> Result<(), ParseError> {
    if map.contains_key(name) {
        return Err(ParseError::DuplicateDeclaration { line, kind, name: name.to_string() });
    }
    map.insert(name.to_string(), value);
    Ok(())
}

fn lookup(
    map: &HashMap<String, usize>,
    line: usize,
    kind: &'static str,
    name: &str,
) -> Result<usize, ParseError> {
    map.get(name).copied().ok_or_else(|| ParseError::UndeclaredSymbol {
        line,
        kind,
        name: name.to_string(),
    })
}

/// Resolves a set of names against `map`, applying `*`, `~` and `-name` over `all`.
fn resolve_set(
    map: &HashMap<String, usize>,
    line: usize,
    kind: &'static str,
    set: &NameSet,
    count: usize,
) -> Result<Vec<usize>, ParseError> {
    let mut selected: BTreeSet<usize> =
        if set.star { (0..count).collect() } else { BTreeSet::new() };
    for name in &set.names {
        selected.insert(lookup(map, line, kind, name)?);
    }
    for name in &set.excluded {
        selected.remove(&lookup(map, line, kind, name)?);
    }
    if set.complement {
        selected = (0..count).filter(|i| !selected.contains(i)).collect();
    }
    Ok(selected.into_iter().collect())
}

struct Builder {
    policy: ParsedPolicy,
    commons: HashMap<String, usize>,
    classes: HashMap<String, usize>,
    defined_classes: HashSet<usize>,
    initial_sids: HashMap<String, usize>,
    roles: HashMap<String, usize>,
    /// Types, attributes and type aliases.
    types: HashMap<String, usize>,
    users: HashMap<String, usize>,
    booleans: HashMap<String, usize>,
    /// Sensitivities and their aliases.
    sensitivities: HashMap<String, usize>,
    /// Categories and their aliases.
    categories: HashMap<String, usize>,
    dominance: Option<(usize, Vec<String>)>,
    conditionals: HashMap<Vec<CondTerm>, usize>,
    te_rules: HashMap<RuleKey, usize>,
    role_allows: HashSet<(usize, usize)>,
    role_transitions: HashMap<(usize, usize, usize), usize>,
    range_transitions: HashMap<(usize, usize, usize), usize>,
    defaults: HashSet<(DefaultRuleType, usize)>,
}

impl Builder {
    fn new(options: &LoadOptions) -> Self {
        let policy = ParsedPolicy {
            version: options.version,
            handle_unknown: options.handle_unknown,
            roles: vec![RoleDecl { name: OBJECT_R.to_string(), types: BTreeSet::new() }],
            ..Default::default()
        };
        Self {
            policy,
            commons: HashMap::new(),
            classes: HashMap::new(),
            defined_classes: HashSet::new(),
            initial_sids: HashMap::new(),
            roles: HashMap::from([(OBJECT_R.to_string(), 0)]),
            types: HashMap::new(),
            users: HashMap::new(),
            booleans: HashMap::new(),
            sensitivities: HashMap::new(),
            categories: HashMap::new(),
            dominance: None,
            conditionals: HashMap::new(),
            te_rules: HashMap::new(),
            role_allows: HashSet::new(),
            role_transitions: HashMap::new(),
            range_transitions: HashMap::new(),
            defaults: HashSet::new(),
        }
    }

    fn apply(
        &mut self,
        pass: Pass,
        statement: &Statement,
        conditional: Option<(usize, bool)>,
    ) -> Result<(), ParseError> {
        match pass {
            Pass::Declare => self.declare(statement),
            Pass::Attach => self.attach(statement),
            Pass::Bind => self.bind(statement, conditional),
        }
    }

    fn declare(&mut self, statement: &Statement) -> Result<(), ParseError> {
        let line = statement.line;
        let policy = &mut self.policy;
        match &statement.kind {
            StatementKind::Common { name, perms } => {
                declare(&mut self.commons, line, "common", name, policy.commons.len())?;
                let mut seen = HashSet::new();
                for perm in perms {
                    if !seen.insert(perm) {
                        return Err(ParseError::DuplicateDeclaration {
                            line,
                            kind: "permission",
                            name: perm.clone(),
                        });
                    }
                }
                policy.commons.push(CommonDecl { name: name.clone(), perms: perms.clone() });
            }
            StatementKind::ClassDecl { name } => {
                declare(&mut self.classes, line, "class", name, policy.classes.len())?;
                policy.classes.push(ClassDecl { name: name.clone(), common: None, perms: vec![] });
            }
            StatementKind::SidDecl { name } => {
                let index = policy.initial_sids.len();
                declare(&mut self.initial_sids, line, "initial sid", name, index)?;
                policy.initial_sids.push(InitialSidDecl { name: name.clone(), context: None });
            }
            StatementKind::Sensitivity { name, aliases } => {
                let value = policy.sensitivities.len();
                declare(&mut self.sensitivities, line, "sensitivity", name, value)?;
                for alias in aliases {
                    declare(&mut self.sensitivities, line, "sensitivity", alias, value)?;
                }
                policy.sensitivities.push(SensitivityDecl {
                    name: name.clone(),
                    aliases: aliases.clone(),
                    value,
                });
                policy.mls = true;
            }
            StatementKind::Dominance { order } => {
                if self.dominance.is_some() {
                    return Err(ParseError::DuplicateDeclaration {
                        line,
                        kind: "dominance",
                        name: "dominance".to_string(),
                    });
                }
                self.dominance = Some((line, order.clone()));
            }
            StatementKind::Category { name, aliases } => {
                let value = policy.categories.len();
                declare(&mut self.categories, line, "category", name, value)?;
                for alias in aliases {
                    declare(&mut self.categories, line, "category", alias, value)?;
                }
                policy.categories.push(CategoryDecl {
                    name: name.clone(),
                    aliases: aliases.clone(),
                    value,
                });
            }
            StatementKind::PolicyCap { name } => {
                if policy.policy_capabilities.iter().any(|cap| &cap.name == name) {
                    warn!("line {}: duplicate policycap {} ignored", line, name);
                } else {
                    if !KNOWN_POLICY_CAPABILITIES.contains(&name.as_str()) {
                        warn!("line {}: unknown policy capability {}", line, name);
                    }
                    policy.policy_capabilities.push(PolicyCapDecl { name: name.clone() });
                }
            }
            StatementKind::Attribute { name } => self.declare_type(line, name, &[], true)?,
            StatementKind::Type { name, aliases, .. } => {
                self.declare_type(line, name, aliases, false)?
            }
            StatementKind::Bool { name, state } => {
                declare(&mut self.booleans, line, "boolean", name, policy.booleans.len())?;
                policy.booleans.push(BooleanDecl { name: name.clone(), state: *state });
            }
            StatementKind::Role { name, .. } => {
                if !self.roles.contains_key(name) {
                    self.roles.insert(name.clone(), policy.roles.len());
                    policy.roles.push(RoleDecl { name: name.clone(), types: BTreeSet::new() });
                }
            }
            StatementKind::User { name, .. } => {
                declare(&mut self.users, line, "user", name, policy.users.len())?;
                policy.users.push(UserDecl {
                    name: name.clone(),
                    roles: BTreeSet::new(),
                    level: None,
                    range: None,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn declare_type(
        &mut self,
        line: usize,
        name: &str,
        aliases: &[String],
        is_attribute: bool,
    ) -> Result<(), ParseError> {
        let kind = if is_attribute { "attribute" } else { "type" };
        let value = self.policy.types.len();
        declare(&mut self.types, line, kind, name, value)?;
        for alias in aliases {
            declare(&mut self.types, line, "type alias", alias, value)?;
        }
        self.policy.types.push(TypeDecl {
            name: name.to_string(),
            is_attribute,
            aliases: aliases.to_vec(),
            attributes: BTreeSet::new(),
            members: BTreeSet::new(),
            permissive: false,
            bounds: None,
        });
        Ok(())
    }

    /// Ranks sensitivities by the `dominance` statement, lowest first.
    fn order_sensitivities(&mut self) -> Result<(), ParseError> {
        let Some((line, order)) = self.dominance.take() else {
            return Ok(());
        };
        let mut ranked = HashSet::new();
        for (rank, name) in order.iter().enumerate() {
            let sensitivity = lookup(&self.sensitivities, line, "sensitivity", name)?;
            if !ranked.insert(sensitivity) {
                return Err(ParseError::InvalidStatement {
                    line,
                    message: format!("sensitivity {} appears twice in the dominance order", name),
                });
            }
            self.policy.sensitivities[sensitivity].value = rank;
        }
        if let Some(missing) =
            (0..self.policy.sensitivities.len()).find(|sensitivity| !ranked.contains(sensitivity))
        {
            return Err(ParseError::InvalidStatement {
                line,
                message: format!(
                    "sensitivity {} is missing from the dominance order",
                    self.policy.sensitivities[missing].name
                ),
            });
        }
        Ok(())
    }

    fn attach(&mut self, statement: &Statement) -> Result<(), ParseError> {
        let line = statement.line;
        match &statement.kind {
            StatementKind::ClassDef { name, common, perms } => {
                let class = lookup(&self.classes, line, "class", name)?;
                if !self.defined_classes.insert(class) {
                    return Err(ParseError::DuplicateDeclaration {
                        line,
                        kind: "class definition",
                        name: name.clone(),
                    });
                }
                let common =
                    common.as_ref().map(|c| lookup(&self.commons, line, "common", c)).transpose()?;
                let mut seen: HashSet<&str> = common
                    .map(|c| self.policy.commons[c].perms.iter().map(String::as_str).collect())
                    .unwrap_or_default();
                for perm in perms {
                    if !seen.insert(perm) {
                        return Err(ParseError::DuplicateDeclaration {
                            line,
                            kind: "permission",
                            name: perm.clone(),
                        });
                    }
                }
                let decl = &mut self.policy.classes[class];
                decl.common = common;
                decl.perms = perms.clone();
            }
            StatementKind::TypeAlias { name, aliases } => {
                let type_ = self.concrete_type(line, name)?;
                for alias in aliases {
                    declare(&mut self.types, line, "type alias", alias, type_)?;
                }
                self.policy.types[type_].aliases.extend(aliases.iter().cloned());
            }
            StatementKind::Type { name, attributes, .. } => {
                let type_ = lookup(&self.types, line, "type", name)?;
                for attribute in attributes {
                    self.add_attribute(line, type_, attribute)?;
                }
            }
            StatementKind::TypeAttribute { name, attributes } => {
                let type_ = self.concrete_type(line, name)?;
                for attribute in attributes {
                    self.add_attribute(line, type_, attribute)?;
                }
            }
            StatementKind::Permissive { name } => {
                let type_ = self.concrete_type(line, name)?;
                let decl = &mut self.policy.types[type_];
                if decl.permissive {
                    warn!("line {}: type {} is already permissive", line, name);
                }
                decl.permissive = true;
            }
            StatementKind::TypeBounds { parent, children } => {
                let parent = self.concrete_type(line, parent)?;
                for child in children {
                    let child = self.concrete_type(line, child)?;
                    self.policy.types[child].bounds = Some(parent);
                }
            }
            StatementKind::Level { level } => {
                let sensitivity =
                    lookup(&self.sensitivities, line, "sensitivity", &level.sensitivity)?;
                if self.policy.levels.iter().any(|l| l.sensitivity == sensitivity) {
                    return Err(ParseError::DuplicateDeclaration {
                        line,
                        kind: "level",
                        name: level.sensitivity.clone(),
                    });
                }
                let categories = self.categories_of(line, &level.categories)?;
                self.policy.levels.push(LevelData { sensitivity, categories });
            }
            _ => {}
        }
        Ok(())
    }

    fn add_attribute(
        &mut self,
        line: usize,
        type_: usize,
        attribute: &str,
    ) -> Result<(), ParseError> {
        let attribute = lookup(&self.types, line, "attribute", attribute)?;
        if !self.policy.types[attribute].is_attribute {
            return Err(ParseError::InvalidStatement {
                line,
                message: format!("{} is not an attribute", self.policy.types[attribute].name),
            });
        }
        self.policy.types[type_].attributes.insert(attribute);
        Ok(())
    }

    fn collect_attribute_members(&mut self) {
        let memberships: Vec<(usize, usize)> = self
            .policy
            .types
            .iter()
            .enumerate()
            .flat_map(|(type_, decl)| decl.attributes.iter().map(move |a| (*a, type_)))
            .collect();
        for (attribute, type_) in memberships {
            self.policy.types[attribute].members.insert(type_);
        }
    }

    fn bind(
        &mut self,
        statement: &Statement,
        conditional: Option<(usize, bool)>,
    ) -> Result<(), ParseError> {
        let line = statement.line;
        match &statement.kind {
            StatementKind::Role { name, types: Some(types) } => {
                let role = lookup(&self.roles, line, "role", name)?;
                let types = self.concrete_types(line, types)?;
                self.policy.roles[role].types.extend(types);
            }
            StatementKind::User { name, roles, level, range } => {
                let user = lookup(&self.users, line, "user", name)?;
                let roles = resolve_set(&self.roles, line, "role", roles, self.policy.roles.len())?;
                if !self.policy.mls && (level.is_some() || range.is_some()) {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: "MLS level or range given in a policy without sensitivities"
                            .to_string(),
                    });
                }
                let level = level.as_ref().map(|level| self.level(line, level)).transpose()?;
                let range = range.as_ref().map(|range| self.range(line, range)).transpose()?;
                let decl = &mut self.policy.users[user];
                decl.roles.extend(roles);
                decl.level = level;
                decl.range = range;
            }
            StatementKind::SidContext { name, context } => {
                let sid = lookup(&self.initial_sids, line, "initial sid", name)?;
                let context = self.context(line, context)?;
                let decl = &mut self.policy.initial_sids[sid];
                if decl.context.is_some() {
                    return Err(ParseError::DuplicateDeclaration {
                        line,
                        kind: "initial sid context",
                        name: name.clone(),
                    });
                }
                decl.context = Some(context);
            }
            StatementKind::Default { ruletype, classes, default, range } => {
                for class in self.classes(line, classes)? {
                    if !self.defaults.insert((*ruletype, class)) {
                        return Err(ParseError::DuplicateDeclaration {
                            line,
                            kind: ruletype.keyword(),
                            name: self.policy.classes[class].name.clone(),
                        });
                    }
                    self.policy.defaults.push(DefaultData {
                        ruletype: *ruletype,
                        class,
                        default: *default,
                        range: *range,
                    });
                }
            }
            StatementKind::Constraint { validatetrans, classes, perms, terms } => {
                let terms = self.constraint_terms(line, terms)?;
                let classes = self.classes(line, classes)?;
                let class_perms = if *validatetrans {
                    vec![BTreeSet::new(); classes.len()]
                } else {
                    self.perms(line, &classes, perms)?
                };
                for (class, perms) in classes.into_iter().zip(class_perms) {
                    self.policy.constraints.push(ConstraintData {
                        validatetrans: *validatetrans,
                        class,
                        perms,
                        terms: terms.clone(),
                    });
                }
            }
            StatementKind::AvRule { ruletype, source, target, classes, perms } => {
                if conditional.is_some() && *ruletype == TeRuleType::NeverAllow {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: "neverallow is not allowed in a conditional block".to_string(),
                    });
                }
                let (sources, targets, self_target) = self.rule_types(line, source, target)?;
                let classes = self.classes(line, classes)?;
                let class_perms = self.perms(line, &classes, perms)?;
                for &source in &sources {
                    for target in Self::targets_of(source, &targets, self_target) {
                        for (&class, perms) in classes.iter().zip(&class_perms) {
                            if perms.is_empty() {
                                continue;
                            }
                            let key = RuleKey {
                                ruletype: *ruletype,
                                source,
                                target,
                                class,
                                conditional,
                                qualifier: None,
                            };
                            self.add_te_rule(key, TeRuleBody::Permissions(perms.clone()));
                        }
                    }
                }
            }
            StatementKind::XpermRule { ruletype, source, target, classes, xperm_type, xperms } => {
                if conditional.is_some() {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: format!("{} is not allowed in a conditional block", ruletype),
                    });
                }
                if !XPERM_TYPES.contains(&xperm_type.as_str()) {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: format!("unknown extended permission type {}", xperm_type),
                    });
                }
                let xperms = Self::xperm_values(xperms);
                let (sources, targets, self_target) = self.rule_types(line, source, target)?;
                let classes = self.classes(line, classes)?;
                for &source in &sources {
                    for target in Self::targets_of(source, &targets, self_target) {
                        for &class in &classes {
                            let key = RuleKey {
                                ruletype: *ruletype,
                                source,
                                target,
                                class,
                                conditional,
                                qualifier: Some(xperm_type.clone()),
                            };
                            let body = TeRuleBody::Xperms {
                                xperm_type: xperm_type.clone(),
                                xperms: xperms.clone(),
                            };
                            self.add_te_rule(key, body);
                        }
                    }
                }
            }
            StatementKind::TypeRule { ruletype, source, target, classes, default, filename } => {
                if filename.is_some() && *ruletype != TeRuleType::TypeTransition {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: format!("{} rules do not take a file name", ruletype),
                    });
                }
                let default = self.concrete_type(line, default)?;
                let (sources, targets, self_target) = self.rule_types(line, source, target)?;
                let classes = self.classes(line, classes)?;
                for &source in &sources {
                    for target in Self::targets_of(source, &targets, self_target) {
                        for &class in &classes {
                            let key = RuleKey {
                                ruletype: *ruletype,
                                source,
                                target,
                                class,
                                conditional,
                                qualifier: filename.clone(),
                            };
                            self.add_type_rule(line, key, default)?;
                        }
                    }
                }
            }
            StatementKind::RangeTransition { source, target, classes, range } => {
                if !self.policy.mls {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: "range_transition requires an MLS policy".to_string(),
                    });
                }
                let range = self.range(line, range)?;
                let (sources, targets, self_target) = self.rule_types(line, source, target)?;
                let classes = self.classes_or_process(line, classes.as_ref())?;
                for &source in &sources {
                    for target in Self::targets_of(source, &targets, self_target) {
                        for &class in &classes {
                            match self.range_transitions.get(&(source, target, class)) {
                                Some(&existing)
                                    if self.policy.mls_rules[existing].range == range => {}
                                Some(_) => {
                                    return Err(ParseError::ConflictingTypeRule {
                                        line,
                                        rule: format!(
                                            "range_transition {} {}:{}",
                                            self.policy.types[source].name,
                                            self.policy.types[target].name,
                                            self.policy.classes[class].name
                                        ),
                                    })
                                }
                                None => {
                                    let index = self.policy.mls_rules.len();
                                    self.range_transitions.insert((source, target, class), index);
                                    self.policy.mls_rules.push(MlsRuleData {
                                        source,
                                        target,
                                        class,
                                        range: range.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
            StatementKind::RoleTransition { roles, types, classes, default } => {
                let roles = resolve_set(&self.roles, line, "role", roles, self.policy.roles.len())?;
                let (types, _) = self.type_elements(line, types, false)?;
                let classes = self.classes_or_process(line, classes.as_ref())?;
                let default = lookup(&self.roles, line, "role", default)?;
                for &source in &roles {
                    for &target in &types {
                        for &class in &classes {
                            self.add_role_transition(line, source, target, class, default)?;
                        }
                    }
                }
            }
            StatementKind::RoleAllow { sources, targets } => {
                let count = self.policy.roles.len();
                let sources = resolve_set(&self.roles, line, "role", sources, count)?;
                let targets = resolve_set(&self.roles, line, "role", targets, count)?;
                for &source in &sources {
                    for &target in &targets {
                        if self.role_allows.insert((source, target)) {
                            self.policy.rbac_rules.push(RbacRuleData::Allow { source, target });
                        }
                    }
                }
            }
            StatementKind::Conditional { expr, if_true, if_false } => {
                for term in expr {
                    if let CondTerm::Bool(name) = term {
                        lookup(&self.booleans, line, "boolean", name)?;
                    }
                }
                let id = match self.conditionals.get(expr) {
                    Some(&id) => id,
                    None => {
                        let id = self.policy.conditionals.len();
                        self.conditionals.insert(expr.clone(), id);
                        self.policy.conditionals.push(expr.clone());
                        id
                    }
                };
                for (branch, statements) in [(true, if_true), (false, if_false)] {
                    for statement in statements {
                        if !matches!(
                            statement.kind,
                            StatementKind::AvRule { .. }
                                | StatementKind::TypeRule { .. }
                                | StatementKind::XpermRule { .. }
                        ) {
                            return Err(ParseError::InvalidStatement {
                                line: statement.line,
                                message: "only TE rules are allowed in a conditional block"
                                    .to_string(),
                            });
                        }
                        self.bind(statement, Some((id, branch)))?;
                    }
                }
            }
            StatementKind::FsUse { behavior, fs_type, context } => {
                let context = self.context(line, context)?;
                self.policy.fs_uses.push(FsUseData {
                    behavior: *behavior,
                    fs_type: fs_type.clone(),
                    context,
                });
            }
            StatementKind::Genfscon { fs_type, path, file_type, context } => {
                let context = self.context(line, context)?;
                self.policy.genfscons.push(GenfsconData {
                    fs_type: fs_type.clone(),
                    path: path.clone(),
                    file_type: file_type.clone(),
                    context,
                });
            }
            StatementKind::Portcon { protocol, low, high, context } => {
                if !PORTCON_PROTOCOLS.contains(&protocol.as_str()) {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: format!("unknown protocol {}", protocol),
                    });
                }
                if low > high {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: format!("port range {}-{} is empty", low, high),
                    });
                }
                let context = self.context(line, context)?;
                self.policy.portcons.push(PortconData {
                    protocol: protocol.clone(),
                    low: *low,
                    high: *high,
                    context,
                });
            }
            StatementKind::Netifcon { interface, context, packet_context } => {
                let context = self.context(line, context)?;
                let packet_context = self.context(line, packet_context)?;
                self.policy.netifcons.push(NetifconData {
                    interface: interface.clone(),
                    context,
                    packet_context,
                });
            }
            StatementKind::Nodecon { address, netmask, context } => {
                let parse_address = |text: &str| {
                    text.parse::<IpAddr>().map_err(|_| ParseError::InvalidStatement {
                        line,
                        message: format!("{} is not an IP address", text),
                    })
                };
                let address = parse_address(address)?;
                let netmask = parse_address(netmask)?;
                if address.is_ipv4() != netmask.is_ipv4() {
                    return Err(ParseError::InvalidStatement {
                        line,
                        message: "nodecon address and netmask are of different families"
                            .to_string(),
                    });
                }
                let context = self.context(line, context)?;
                self.policy.nodecons.push(NodeconData { address, netmask, context });
            }
            _ => {}
        }
        Ok(())
    }

    fn concrete_type(&self, line: usize, name: &str) -> Result<usize, ParseError> {
        let type_ = lookup(&self.types, line, "type", name)?;
        if self.policy.types[type_].is_attribute {
            return Err(ParseError::InvalidStatement {
                line,
                message: format!("{} is an attribute, not a type", name),
            });
        }
        Ok(type_)
    }

    fn expand_type(&self, type_: usize) -> Vec<usize> {
        let decl = &self.policy.types[type_];
        if decl.is_attribute {
            decl.members.iter().copied().collect()
        } else {
            vec![type_]
        }
    }

    fn concrete_type_count(&self) -> impl Iterator<Item = usize> + '_ {
        self.policy.types.iter().enumerate().filter(|(_, t)| !t.is_attribute).map(|(i, _)| i)
    }

    /// Resolves a type set to rule elements. A plain list keeps its attributes; `*`, `~` and
    /// exclusions expand to concrete types. When `allow_self` is set, `self` is removed from the
    /// set and reported separately.
    fn type_elements(
        &self,
        line: usize,
        set: &NameSet,
        allow_self: bool,
    ) -> Result<(Vec<usize>, bool), ParseError> {
        let is_self = |name: &String| allow_self && name == "self";
        let self_target = set.names.iter().any(is_self);
        let names = set.names.iter().filter(|name| !is_self(name));
        if set.is_plain() {
            let mut elements = Vec::new();
            for name in names {
                let type_ = lookup(&self.types, line, "type", name)?;
                if !elements.contains(&type_) {
                    elements.push(type_);
                }
            }
            return Ok((elements, self_target));
        }

        let mut selected: BTreeSet<usize> =
            if set.star { self.concrete_type_count().collect() } else { BTreeSet::new() };
        for name in names {
            selected.extend(self.expand_type(lookup(&self.types, line, "type", name)?));
        }
        for name in &set.excluded {
            for type_ in self.expand_type(lookup(&self.types, line, "type", name)?) {
                selected.remove(&type_);
            }
        }
        if set.complement {
            selected = self.concrete_type_count().filter(|t| !selected.contains(t)).collect();
        }
        Ok((selected.into_iter().collect(), self_target))
    }

    /// Resolves a type set to concrete types, expanding attributes.
    fn concrete_types(&self, line: usize, set: &NameSet) -> Result<BTreeSet<usize>, ParseError> {
        let (elements, _) = self.type_elements(line, set, false)?;
        Ok(elements.into_iter().flat_map(|t| self.expand_type(t)).collect())
    }

    fn rule_types(
        &self,
        line: usize,
        source: &NameSet,
        target: &NameSet,
    ) -> Result<(Vec<usize>, Vec<usize>, bool), ParseError> {
        let (sources, _) = self.type_elements(line, source, false)?;
        let (targets, self_target) = self.type_elements(line, target, true)?;
        Ok((sources, targets, self_target))
    }

    fn targets_of(source: usize, targets: &[usize], self_target: bool) -> Vec<usize> {
        let mut result = targets.to_vec();
        if self_target && !result.contains(&source) {
            result.push(source);
        }
        result
    }

    fn classes(&self, line: usize, set: &NameSet) -> Result<Vec<usize>, ParseError> {
        resolve_set(&self.classes, line, "class", set, self.policy.classes.len())
    }

    fn classes_or_process(
        &self,
        line: usize,
        set: Option<&NameSet>,
    ) -> Result<Vec<usize>, ParseError> {
        match set {
            Some(set) => self.classes(line, set),
            None => Ok(vec![lookup(&self.classes, line, "class", PROCESS_CLASS)?]),
        }
    }

    /// Resolves a permission set against each of `classes`. A named permission must exist in
    /// at least one of the classes; each class gets the named permissions it defines.
    fn perms(
        &self,
        line: usize,
        classes: &[usize],
        set: &NameSet,
    ) -> Result<Vec<BTreeSet<String>>, ParseError> {
        for name in set.names.iter().chain(&set.excluded) {
            let declared =
                classes.iter().any(|&class| self.policy.class_perms(class).contains(name.as_str()));
            if !declared {
                let class = classes.first().map(|&c| self.policy.classes[c].name.clone());
                return Err(ParseError::UnknownPermission {
                    line,
                    class: class.unwrap_or_default(),
                    permission: name.clone(),
                });
            }
        }
        Ok(classes
            .iter()
            .map(|&class| {
                let all = self.policy.class_perms(class);
                let mut selected: BTreeSet<&str> =
                    if set.star { all.clone() } else { BTreeSet::new() };
                selected.extend(set.names.iter().map(String::as_str).filter(|p| all.contains(p)));
                for excluded in &set.excluded {
                    selected.remove(excluded.as_str());
                }
                if set.complement {
                    selected = all.difference(&selected).copied().collect();
                }
                selected.into_iter().map(str::to_string).collect()
            })
            .collect())
    }

    fn xperm_values(spec: &XpermSpec) -> BTreeSet<u16> {
        let selected: BTreeSet<u16> =
            spec.ranges.iter().flat_map(|&(low, high)| low..=high).collect();
        if spec.complement {
            (0..=u16::MAX).filter(|value| !selected.contains(value)).collect()
        } else {
            selected
        }
    }

    fn add_te_rule(&mut self, key: RuleKey, body: TeRuleBody) {
        if let Some(&existing) = self.te_rules.get(&key) {
            match (&mut self.policy.te_rules[existing].body, body) {
                (TeRuleBody::Permissions(perms), TeRuleBody::Permissions(more)) => {
                    perms.extend(more)
                }
                (TeRuleBody::Xperms { xperms, .. }, TeRuleBody::Xperms { xperms: more, .. }) => {
                    xperms.extend(more)
                }
                _ => {}
            }
            return;
        }
        self.te_rules.insert(key.clone(), self.policy.te_rules.len());
        self.policy.te_rules.push(TeRuleData {
            ruletype: key.ruletype,
            source: key.source,
            target: key.target,
            class: key.class,
            body,
            conditional: key.conditional,
        });
    }

    fn add_type_rule(
        &mut self,
        line: usize,
        key: RuleKey,
        default: usize,
    ) -> Result<(), ParseError> {
        if let Some(&existing) = self.te_rules.get(&key) {
            return match &self.policy.te_rules[existing].body {
                TeRuleBody::Default { default: current, .. } if *current == default => Ok(()),
                _ => Err(ParseError::ConflictingTypeRule {
                    line,
                    rule: format!(
                        "{} {} {}:{} {}",
                        key.ruletype,
                        self.policy.types[key.source].name,
                        self.policy.types[key.target].name,
                        self.policy.classes[key.class].name,
                        self.policy.types[default].name
                    ),
                }),
            };
        }
        let filename = key.qualifier.clone();
        self.add_te_rule(key, TeRuleBody::Default { default, filename });
        Ok(())
    }

    fn add_role_transition(
        &mut self,
        line: usize,
        source: usize,
        target: usize,
        class: usize,
        default: usize,
    ) -> Result<(), ParseError> {
        match self.role_transitions.get(&(source, target, class)) {
            Some(&existing) => match self.policy.rbac_rules[existing] {
                RbacRuleData::Transition { default: current, .. } if current == default => Ok(()),
                _ => Err(ParseError::ConflictingTypeRule {
                    line,
                    rule: format!(
                        "role_transition {} {}:{} {}",
                        self.policy.roles[source].name,
                        self.policy.types[target].name,
                        self.policy.classes[class].name,
                        self.policy.roles[default].name
                    ),
                }),
            },
            None => {
                self.role_transitions.insert((source, target, class), self.policy.rbac_rules.len());
                self.policy.rbac_rules.push(RbacRuleData::Transition {
                    source,
                    target,
                    class,
                    default,
                });
                Ok(())
            }
        }
    }

    /// Resolves the names of names-terms to their declared symbols, keeping the kind of symbol
    /// each operand compares against.
    fn constraint_terms(
        &self,
        line: usize,
        terms: &[ConstraintTerm],
    ) -> Result<Vec<ConstraintTerm>, ParseError> {
        terms
            .iter()
            .map(|term| -> Result<ConstraintTerm, ParseError> {
                let ConstraintTerm::Names { sym_type, operator, names } = term else {
                    return Ok(term.clone());
                };
                let kind = sym_type & (CEXPR_SYM_USER | CEXPR_SYM_ROLE | CEXPR_SYM_TYPE);
                let names = names
                    .iter()
                    .map(|name| match kind {
                        CEXPR_SYM_USER => lookup(&self.users, line, "user", name)
                            .map(|u| self.policy.users[u].name.clone()),
                        CEXPR_SYM_ROLE => lookup(&self.roles, line, "role", name)
                            .map(|r| self.policy.roles[r].name.clone()),
                        _ => lookup(&self.types, line, "type", name)
                            .map(|t| self.policy.types[t].name.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ConstraintTerm::Names { sym_type: *sym_type, operator: *operator, names })
            })
            .collect()
    }

    fn categories_of(&self, line: usize, specs: &[CategorySpec]) -> Result<Vec<usize>, ParseError> {
        let mut categories = BTreeSet::new();
        for spec in specs {
            match spec {
                CategorySpec::Single(name) => {
                    categories.insert(lookup(&self.categories, line, "category", name)?);
                }
                CategorySpec::Span(low, high) => {
                    let low_value = lookup(&self.categories, line, "category", low)?;
                    let high_value = lookup(&self.categories, line, "category", high)?;
                    if low_value > high_value {
                        return Err(ParseError::InvalidStatement {
                            line,
                            message: format!("category range {}.{} is reversed", low, high),
                        });
                    }
                    categories.extend(low_value..=high_value);
                }
            }
        }
        Ok(categories.into_iter().collect())
    }

    /// Resolves a level, checking its categories against the level declaration of its
    /// sensitivity.
    fn level(&self, line: usize, spec: &LevelSpec) -> Result<LevelData, ParseError> {
        let sensitivity = lookup(&self.sensitivities, line, "sensitivity", &spec.sensitivity)?;
        let categories = self.categories_of(line, &spec.categories)?;
        let decl = self
            .policy
            .levels
            .iter()
            .find(|level| level.sensitivity == sensitivity)
            .ok_or_else(|| ParseError::InvalidStatement {
                line,
                message: format!("sensitivity {} has no level declaration", spec.sensitivity),
            })?;
        if let Some(category) = categories.iter().find(|c| !decl.categories.contains(c)) {
            return Err(ParseError::InvalidStatement {
                line,
                message: format!(
                    "category {} is not allowed with sensitivity {}",
                    self.policy.categories[*category].name, spec.sensitivity
                ),
            });
        }
        Ok(LevelData { sensitivity, categories })
    }

    fn range(&self, line: usize, spec: &RangeSpec) -> Result<RangeData, ParseError> {
        let low = self.level(line, &spec.low)?;
        let high = match &spec.high {
            Some(high) => self.level(line, high)?,
            None => low.clone(),
        };
        if !self.policy.dominates(&high, &low) {
            return Err(ParseError::InvalidStatement {
                line,
                message: "high level of range does not dominate the low level".to_string(),
            });
        }
        Ok(RangeData { low, high })
    }

    fn context(&self, line: usize, spec: &ContextSpec) -> Result<ContextData, ParseError> {
        let user = lookup(&self.users, line, "user", &spec.user)?;
        let role = lookup(&self.roles, line, "role", &spec.role)?;
        let type_ = self.concrete_type(line, &spec.type_)?;
        let range = match (&spec.range, self.policy.mls) {
            (Some(range), true) => Some(self.range(line, range)?),
            (None, false) => None,
            (Some(_), false) => {
                return Err(ParseError::InvalidStatement {
                    line,
                    message: "MLS range given in a policy without sensitivities".to_string(),
                })
            }
            (None, true) => {
                return Err(ParseError::InvalidStatement {
                    line,
                    message: "context is missing an MLS range".to_string(),
                })
            }
        };
        Ok(ContextData { user, role, type_, range })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const BASE: &str = r#"
class file
class dir
class process
common file { read write getattr }
class file inherits file { execute }
class dir inherits file { search }
class process { transition }
attribute domain;
type init_t, domain;
type shell_t, domain;
type etc_t;
bool b1 true;
bool b2 false;
role system_r types domain;
user system_u roles system_r;
"#;

    fn parse(rules: &str) -> Result<ParsedPolicy, ParseError> {
        ParsedPolicy::parse(&format!("{}{}", BASE, rules), &LoadOptions::default())
    }

    fn te_rule_count(policy: &ParsedPolicy) -> usize {
        policy.te_rules.len()
    }

    #[test]
    fn object_r_is_implicit() {
        let policy = parse("").expect("parse");
        assert_eq!(policy.roles[0].name, OBJECT_R);
        assert!(!policy.mls);
        assert_eq!(policy.version, 33);
        assert_eq!(policy.handle_unknown, HandleUnknown::Deny);
    }

    #[test]
    fn av_rules_expand_per_class_and_merge() {
        let policy = parse(
            "allow domain etc_t:{ file dir } read;\nallow domain etc_t:file { write getattr };\n",
        )
        .expect("parse");
        assert_eq!(te_rule_count(&policy), 2);
        assert_matches!(
            &policy.te_rules[0].body,
            TeRuleBody::Permissions(perms) if perms.len() == 3
        );
    }

    #[test]
    fn self_and_complement_targets() {
        let policy = parse("allow domain self:process transition;\n").expect("parse");
        assert_eq!(te_rule_count(&policy), 1);
        assert_eq!(policy.te_rules[0].target, policy.te_rules[0].source);

        let policy = parse("allow { domain -shell_t } ~etc_t:file read;\n").expect("parse");
        let targets: BTreeSet<usize> = policy.te_rules.iter().map(|r| r.target).collect();
        assert_eq!(targets.len(), 2);
        assert!(policy.te_rules.iter().all(|r| policy.types[r.source].name == "init_t"));
    }

    #[test]
    fn permission_sets() {
        let policy = parse("allow init_t etc_t:{ file dir } ~{ read write };\n").expect("parse");
        let perms: Vec<Vec<&str>> = policy
            .te_rules
            .iter()
            .map(|r| match &r.body {
                TeRuleBody::Permissions(perms) => perms.iter().map(String::as_str).collect(),
                _ => vec![],
            })
            .collect();
        assert_eq!(perms, vec![vec!["execute", "getattr"], vec!["getattr", "search"]]);

        assert_matches!(
            parse("allow init_t etc_t:file fly;\n"),
            Err(ParseError::UnknownPermission { permission, .. }) if permission == "fly"
        );
    }

    #[test]
    fn type_rules_conflict() {
        let policy = parse(
            "type_transition init_t etc_t:file shell_t;\ntype_transition init_t etc_t:file shell_t;\n",
        )
        .expect("parse");
        assert_eq!(te_rule_count(&policy), 1);
        assert_matches!(
            parse("type_transition init_t etc_t:file shell_t;\ntype_transition init_t etc_t:file init_t;\n"),
            Err(ParseError::ConflictingTypeRule { line, .. }) if line > 0
        );
        assert_matches!(
            parse("type_change init_t etc_t:file shell_t \"name\";\n"),
            Err(ParseError::InvalidStatement { .. })
        );
    }

    #[test]
    fn conditionals_share_expressions() {
        let policy = parse(
            "if (b1) { allow init_t etc_t:file read; }\nif (b1) { allow shell_t etc_t:file read; } else { allow init_t etc_t:file write; }\n",
        )
        .expect("parse");
        assert_eq!(policy.conditionals.len(), 1);
        assert_eq!(policy.te_rules[2].conditional, Some((0, false)));
        assert_matches!(
            parse("if (b3) { allow init_t etc_t:file read; }\n"),
            Err(ParseError::UndeclaredSymbol { kind: "boolean", .. })
        );
        assert_matches!(
            parse("if (b1) { neverallow init_t etc_t:file read; }\n"),
            Err(ParseError::InvalidStatement { .. })
        );
        assert_matches!(
            parse("if (b1) { role extra_r; }\n"),
            Err(ParseError::InvalidStatement { .. })
        );
    }

    #[test]
    fn declarations_may_follow_uses() {
        let policy = parse("allow late_t etc_t:file read;\ntype late_t;\n").expect("parse");
        assert_eq!(te_rule_count(&policy), 1);
    }

    #[test]
    fn undeclared_and_duplicate_symbols() {
        assert_matches!(
            parse("allow nobody_t etc_t:file read;\n"),
            Err(ParseError::UndeclaredSymbol { kind: "type", .. })
        );
        assert_matches!(
            parse("type etc_t;\n"),
            Err(ParseError::DuplicateDeclaration { kind: "type", .. })
        );
        assert_matches!(
            parse("typeattribute etc_t shell_t;\n"),
            Err(ParseError::InvalidStatement { .. })
        );
    }

    #[test]
    fn role_transitions_default_to_process() {
        let policy = parse("role_transition system_r etc_t system_r;\n").expect("parse");
        assert_matches!(
            policy.rbac_rules[0],
            RbacRuleData::Transition { class, .. } if policy.classes[class].name == "process"
        );
    }

    #[test]
    fn mls_statements_require_sensitivities() {
        assert_matches!(
            parse("range_transition init_t etc_t:file s0;\n"),
            Err(ParseError::InvalidStatement { .. })
        );
    }

    #[test]
    fn validation() {
        let policy = parse("").expect("parse");
        assert_eq!(policy.validate(), Ok(()));

        let mut broken = policy.clone();
        broken.constraints.push(ConstraintData {
            validatetrans: false,
            class: 0,
            perms: BTreeSet::new(),
            terms: vec![ConstraintTerm::And],
        });
        assert_matches!(broken.validate(), Err(ValidateError::InvalidConstraint { .. }));

        let mut broken = policy;
        broken.classes[0].perms = (0..40).map(|i| format!("p{}", i)).collect();
        assert_matches!(
            broken.validate(),
            Err(ValidateError::TooManyPermissions { count: 43, .. })
        );
    }
}
