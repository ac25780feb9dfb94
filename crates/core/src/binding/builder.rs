use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::binding::handler::{CallbackResult, Handler, ParamSpec};
use crate::binding::table::{BindingTable, ErasedHandler, MethodBinding, ParamBinding, Yields};
use crate::error::{BindingError, CallbackError};
use crate::source::SourceKind;
use crate::visitor::{Bind, Visitor, VisitorType, downcast_visitor};

type TypedHandler<K, V> =
    Arc<dyn Fn(&mut V, Vec<<K as SourceKind>::Arg>) -> CallbackResult<K> + Send + Sync>;

/// A table together with the statically known nested visitor types that
/// must be registered alongside it.
pub(crate) struct BuiltTable<K: SourceKind> {
    pub(crate) table: BindingTable<K>,
    pub(crate) nested: Vec<VisitorType<K>>,
}

/// One binding as written in [`Bind::bind`], validated when the table is
/// finished.
pub struct Declaration<K: SourceKind, V> {
    owner: &'static str,
    key: String,
    params: Vec<String>,
    specs: Vec<ParamSpec>,
    yields: Yields<K>,
    handler: TypedHandler<K, V>,
}

impl<K: SourceKind, V: Visitor> Declaration<K, V> {
    /// Marks the produced visitors as being of type `W`, whose table is then
    /// built eagerly together with this one.
    pub fn yields<W: Bind<K>>(&mut self) -> &mut Self {
        self.yields = Yields::Visitor(VisitorType::of::<W>());
        self
    }

    fn project<C: Visitor>(self, project: fn(&mut C) -> &mut V) -> Declaration<K, C> {
        let handler = self.handler;
        Declaration {
            owner: self.owner,
            key: self.key,
            params: self.params,
            specs: self.specs,
            yields: self.yields,
            handler: Arc::new(move |visitor: &mut C, args: Vec<K::Arg>| {
                handler(project(visitor), args)
            }),
        }
    }

    fn into_binding(self) -> Result<MethodBinding<K>, BindingError> {
        if self.params.len() < self.specs.len() {
            return Err(BindingError::MissingParameterBinding {
                visitor: self.owner,
                key: self.key,
                index: self.params.len(),
            });
        }
        if self.params.len() > self.specs.len() {
            return Err(BindingError::SurplusParameterBinding {
                visitor: self.owner,
                key: self.key,
                declared: self.params.len(),
                arity: self.specs.len(),
            });
        }

        let key = K::normalize_key(&self.key)?;
        let params = self
            .params
            .iter()
            .zip(&self.specs)
            .map(|(raw, spec)| {
                K::normalize_param(raw)
                    .map(|key| ParamBinding::new(key, spec.value_type, spec.optional))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let handler = self.handler;
        let erased: ErasedHandler<K> =
            Arc::new(move |visitor: &mut (dyn Visitor + 'static), args: Vec<K::Arg>| {
                let visitor = downcast_visitor::<V>(visitor).ok_or_else(|| {
                    CallbackError::from(format!("visitor is not a {}", type_name::<V>()))
                })?;
                handler(visitor, args)
            });

        Ok(MethodBinding::new(key, params, self.yields, erased))
    }
}

/// Collects the bindings of visitor type `V` for source kind `K`.
pub struct TableBuilder<K: SourceKind, V> {
    own: Vec<Declaration<K, V>>,
    inherited: Vec<Declaration<K, V>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: SourceKind, V: Visitor> TableBuilder<K, V> {
    pub(crate) fn new() -> Self {
        Self { own: Vec::new(), inherited: Vec::new(), _kind: PhantomData }
    }

    /// Binds `handler` to `key`; `params` names the path key of each handler
    /// parameter, in order.
    pub fn bind<'p, P, H>(
        &mut self,
        key: &str,
        params: impl IntoIterator<Item = &'p str>,
        handler: H,
    ) -> &mut Declaration<K, V>
    where
        H: Handler<K, V, P>,
    {
        let yields = if H::YIELDS { Yields::Dynamic } else { Yields::Nothing };
        let handler = Arc::new(handler);
        self.own.push(Declaration {
            owner: type_name::<V>(),
            key: key.to_owned(),
            params: params.into_iter().map(str::to_owned).collect(),
            specs: H::parameters(),
            yields,
            handler: Arc::new(move |visitor: &mut V, args: Vec<K::Arg>| handler.handle(visitor, args)),
        });
        let last = self.own.len() - 1;
        &mut self.own[last]
    }

    /// Pulls in every binding of the embedded visitor `P`, reached through
    /// `project`. Bindings of `V` itself take precedence on equal keys.
    pub fn inherit<P: Bind<K>>(&mut self, project: fn(&mut V) -> &mut P) -> &mut Self {
        let mut parent = TableBuilder::<K, P>::new();
        P::bind(&mut parent);
        for declaration in parent.own.into_iter().chain(parent.inherited) {
            self.inherited.push(declaration.project(project));
        }
        self
    }

    pub(crate) fn finish(self) -> Result<BuiltTable<K>, BindingError> {
        let mut table = BindingTable::new(type_name::<V>());
        let mut nested = Vec::new();

        for declaration in self.own {
            let binding = declaration.into_binding()?;
            if table.contains(binding.key()) {
                return Err(BindingError::DuplicateBinding {
                    visitor: type_name::<V>(),
                    key: binding.key().to_owned(),
                });
            }
            if let Yields::Visitor(ty) = binding.yields() {
                nested.push(*ty);
            }
            table.insert(binding);
        }

        for declaration in self.inherited {
            let binding = declaration.into_binding()?;
            if table.contains(binding.key()) {
                continue;
            }
            if let Yields::Visitor(ty) = binding.yields() {
                nested.push(*ty);
            }
            table.insert(binding);
        }

        Ok(BuiltTable { table, nested })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::Nested;
    use rstest::rstest;

    struct Probe;

    impl SourceKind for Probe {
        const NAME: &'static str = "probe";
        type Arg = i64;

        fn normalize_key(raw: &str) -> Result<String, BindingError> {
            let key = raw.trim().trim_end_matches('/');
            if key.is_empty() {
                return Err(BindingError::invalid_key(raw, "empty key"));
            }
            Ok(key.to_owned())
        }
    }

    impl crate::value_type::FromArg<i64> for i64 {
        const VALUE_TYPE: crate::value_type::ValueType = crate::value_type::ValueType::Long;

        fn from_arg(arg: i64) -> Result<Self, &'static str> {
            Ok(arg)
        }
    }

    #[derive(Default)]
    struct Base {
        seen: Vec<i64>,
    }

    impl Visitor for Base {
        fn visit_end(&mut self) {}
    }

    impl Bind<Probe> for Base {
        fn bind(bindings: &mut TableBuilder<Probe, Self>) {
            bindings.bind("a", ["x"], |base: &mut Base, x: i64| base.seen.push(x));
            bindings.bind("shared", [], |base: &mut Base| base.seen.push(-1));
        }
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        own: Vec<i64>,
    }

    impl Visitor for Derived {
        fn visit_end(&mut self) {}
    }

    impl Bind<Probe> for Derived {
        fn bind(bindings: &mut TableBuilder<Probe, Self>) {
            bindings.bind("shared", [], |derived: &mut Derived| derived.own.push(0));
            bindings.bind("sum", ["x", "y"], |derived: &mut Derived, x: i64, y: i64| {
                derived.own.push(x + y);
            });
            bindings.bind("child", [], |_: &mut Derived| Nested::<Probe>::new(Base::default())).yields::<Base>();
            bindings.inherit::<Base>(|derived: &mut Derived| &mut derived.base);
        }
    }

    fn build<V: Bind<Probe>>() -> Result<BuiltTable<Probe>, BindingError> {
        let mut builder = TableBuilder::<Probe, V>::new();
        V::bind(&mut builder);
        builder.finish()
    }

    #[rstest]
    fn own_bindings_precede_inherited_ones() {
        let built = build::<Derived>().expect("table builds");
        let keys: Vec<_> = built.table.keys().collect();
        assert_eq!(keys, ["shared", "sum", "child", "a"]);
        assert_eq!(built.nested, vec![VisitorType::<Probe>::of::<Base>()]);
    }

    #[rstest]
    fn own_binding_overrides_inherited() {
        let built = build::<Derived>().expect("table builds");
        let mut visitor = Derived::default();
        let shared = built.table.get("shared").expect("bound");
        shared.invoke(&mut visitor, Vec::new()).expect("callback succeeds");
        assert_eq!(visitor.own, [0]);
        assert!(visitor.base.seen.is_empty());
    }

    #[rstest]
    fn inherited_binding_reaches_embedded_visitor() {
        let built = build::<Derived>().expect("table builds");
        let mut visitor = Derived::default();
        built.table.get("a").expect("bound").invoke(&mut visitor, vec![7]).expect("ok");
        built.table.get("sum").expect("bound").invoke(&mut visitor, vec![2, 3]).expect("ok");
        assert_eq!(visitor.base.seen, [7]);
        assert_eq!(visitor.own, [5]);
    }

    #[rstest]
    fn invoking_on_wrong_visitor_type_fails() {
        let built = build::<Derived>().expect("table builds");
        let mut other = Base::default();
        let result = built.table.get("sum").expect("bound").invoke(&mut other, vec![1, 1]);
        assert!(result.is_err());
    }

    struct MissingKey;

    impl Visitor for MissingKey {
        fn visit_end(&mut self) {}
    }

    impl Bind<Probe> for MissingKey {
        fn bind(bindings: &mut TableBuilder<Probe, Self>) {
            bindings.bind("m", ["x"], |_: &mut MissingKey, _x: i64, _y: i64| {});
        }
    }

    #[rstest]
    fn parameter_without_key_is_rejected() {
        let err = build::<MissingKey>().err().expect("must fail");
        assert!(matches!(err, BindingError::MissingParameterBinding { index: 1, .. }));
    }

    struct SurplusKey;

    impl Visitor for SurplusKey {
        fn visit_end(&mut self) {}
    }

    impl Bind<Probe> for SurplusKey {
        fn bind(bindings: &mut TableBuilder<Probe, Self>) {
            bindings.bind("s", ["x", "y"], |_: &mut SurplusKey, _x: i64| {});
        }
    }

    #[rstest]
    fn surplus_parameter_key_is_rejected() {
        let err = build::<SurplusKey>().err().expect("must fail");
        assert!(matches!(err, BindingError::SurplusParameterBinding { declared: 2, arity: 1, .. }));
    }

    struct Twice;

    impl Visitor for Twice {
        fn visit_end(&mut self) {}
    }

    impl Bind<Probe> for Twice {
        fn bind(bindings: &mut TableBuilder<Probe, Self>) {
            bindings.bind("dup", [], |_: &mut Twice| {});
            bindings.bind("dup/", [], |_: &mut Twice| {});
        }
    }

    #[rstest]
    fn equal_normalized_keys_are_rejected() {
        let err = build::<Twice>().err().expect("must fail");
        assert!(matches!(err, BindingError::DuplicateBinding { ref key, .. } if key == "dup"));
    }

    #[rstest]
    fn callback_errors_surface_from_invoke() {
        struct Failing;

        impl Visitor for Failing {
            fn visit_end(&mut self) {}
        }

        impl Bind<Probe> for Failing {
            fn bind(bindings: &mut TableBuilder<Probe, Self>) {
                bindings.bind("f", [], |_: &mut Failing| -> Result<(), String> {
                    Err("boom".to_owned())
                });
            }
        }

        let built = build::<Failing>().expect("table builds");
        let binding = built.table.get("f").expect("bound");
        assert!(binding.yields().is_nothing());
        let err = binding.invoke(&mut Failing, Vec::new()).expect_err("callback fails");
        assert_eq!(err.to_string(), "boom");
    }
}
