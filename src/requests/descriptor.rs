use crate::{services::short_type_name, Key, ServiceInfo};
use derive_more::Display;
use std::{
    borrow::Cow,
    fmt::{Display as FmtDisplay, Formatter},
};

/// One required input of a constructor or member operation, as declared by
/// the type of the parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Dependency {
    key: Key,
    optional: bool,
    deferred: bool,
}

impl Dependency {
    /// A dependency that fails the build when no provider exists.
    #[must_use]
    pub fn required(key: Key) -> Self {
        Dependency {
            key,
            optional: false,
            deferred: false,
        }
    }

    /// A dependency that binds "absent" when no provider exists.
    #[must_use]
    pub fn optional(key: Key) -> Self {
        Dependency {
            optional: true,
            ..Dependency::required(key)
        }
    }

    /// Marks this dependency as resolved on demand rather than before the
    /// consumer is invoked. Deferred dependencies never order pool writes.
    #[must_use]
    pub fn deferred(self) -> Self {
        Dependency {
            deferred: true,
            ..self
        }
    }

    /// The key of the requested service.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }

    /// Whether the dependency may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the dependency is resolved on demand.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }
}

/// The syntactic kind of member a dependency was declared on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum SiteKind {
    /// A parameter of a bean constructor.
    #[display(fmt = "constructor parameter")]
    Constructor,
    /// A parameter of a member operation.
    #[display(fmt = "method parameter")]
    Method,
    /// An injected field.
    #[display(fmt = "field")]
    Field,
}

/// A dependency at a fixed position of its owning operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DependencyDescriptor {
    dependency: Dependency,
    index: usize,
    site: SiteKind,
}

impl DependencyDescriptor {
    pub(crate) fn new(
        dependency: Dependency,
        index: usize,
        site: SiteKind,
    ) -> Self {
        DependencyDescriptor {
            dependency,
            index,
            site,
        }
    }

    /// The requested dependency.
    #[must_use]
    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    /// The key of the requested service.
    #[must_use]
    pub fn key(&self) -> Key {
        self.dependency.key()
    }

    /// Whether the dependency may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.dependency.is_optional()
    }

    /// The position of the dependency in the operation's parameter list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The kind of member the dependency was declared on.
    #[must_use]
    pub fn site(&self) -> SiteKind {
        self.site
    }
}

/// The member a dependency node invokes: its owning type and its name.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MemberSite {
    owner: ServiceInfo,
    name: Cow<'static, str>,
    kind: SiteKind,
}

impl MemberSite {
    pub(crate) fn new(
        owner: ServiceInfo,
        name: impl Into<Cow<'static, str>>,
        kind: SiteKind,
    ) -> Self {
        MemberSite {
            owner,
            name: name.into(),
            kind,
        }
    }

    /// Derives the member name from the type name of the function that
    /// implements it, for example `new` for `Server::new`.
    pub(crate) fn of_function<F>(owner: ServiceInfo, kind: SiteKind) -> Self {
        MemberSite::named_after(owner, std::any::type_name::<F>(), kind)
    }

    pub(crate) fn named_after(
        owner: ServiceInfo,
        function: &'static str,
        kind: SiteKind,
    ) -> Self {
        let name = short_type_name(function);
        let name = if name.ends_with("{{closure}}") {
            Cow::Borrowed("<closure>")
        } else {
            Cow::Owned(name)
        };
        MemberSite { owner, name, kind }
    }

    /// The type that declares the member.
    #[must_use]
    pub fn owner(&self) -> ServiceInfo {
        self.owner
    }

    /// The name of the member.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of member.
    #[must_use]
    pub fn kind(&self) -> SiteKind {
        self.kind
    }

    /// Renders the member with its parameter list. The parameters at
    /// `marked` are wrapped in brackets so a failing parameter can be told
    /// apart from siblings of the same type, for example
    /// `Server::new(Pool, [Pool])`.
    #[must_use]
    pub fn signature(
        &self,
        dependencies: &[DependencyDescriptor],
        marked: &[usize],
    ) -> String {
        let parameters: Vec<String> = dependencies
            .iter()
            .map(|descriptor| {
                let mut rendered = descriptor.key().to_string();
                if descriptor.is_optional() {
                    rendered.push('?');
                }
                if marked.contains(&descriptor.index()) {
                    format!("[{rendered}]")
                } else {
                    rendered
                }
            })
            .collect();
        format!("{self}({})", parameters.join(", "))
    }
}

impl FmtDisplay for MemberSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let owner = self.owner.short_name();
        if self.name.as_ref() == owner.as_str() {
            f.write_str(&owner)
        } else {
            write!(f, "{owner}::{}", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Server;
    struct Pool;

    impl Server {
        fn new() -> Self {
            Server
        }
    }

    fn site_of<F>(_: &F) -> MemberSite {
        MemberSite::of_function::<F>(ServiceInfo::of::<Server>(), SiteKind::Constructor)
    }

    #[test]
    fn member_names_come_from_function_names() {
        assert_eq!("Server::new", site_of(&Server::new).to_string());
        assert_eq!("Server::<closure>", site_of(&|| Server).to_string());
        let _ = Server::new();
    }

    #[test]
    fn signature_marks_the_failing_sibling() {
        let site = MemberSite::new(
            ServiceInfo::of::<Server>(),
            "new",
            SiteKind::Constructor,
        );
        let dependencies = [
            DependencyDescriptor::new(
                Dependency::required(Key::of::<Pool>()),
                0,
                SiteKind::Constructor,
            ),
            DependencyDescriptor::new(
                Dependency::required(Key::of::<Pool>()),
                1,
                SiteKind::Constructor,
            ),
            DependencyDescriptor::new(
                Dependency::optional(Key::of::<u8>()),
                2,
                SiteKind::Constructor,
            ),
        ];

        assert_eq!(
            "Server::new(Pool, [Pool], u8?)",
            site.signature(&dependencies, &[1])
        );
    }
}
