//! Scopes and symbols.
//!
//! Scopes live in an arena owned by [`SymbolTable`] and refer to their parent
//! through a [`ScopeId`]. Lookups walk from a scope up to the global scope and
//! never down. Classes are stored in a separate arena and referenced by
//! [`ClassId`], which is also how a method refers back to its owning class.

use std::collections::HashMap;

use crate::{ast::types::Type, Position};

use super::builtins::Builtin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Parameter,
    Field,
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub var_type: Type,
    pub kind: VariableKind,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub parameters: Vec<VariableSymbol>,
    pub return_type: Type,
    pub is_entry: bool,
    /// Owning class, lookup only
    pub class: ClassId,
    pub scope: ScopeId,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub scope: ScopeId,
    /// Declaration order is the struct layout order
    pub fields: Vec<VariableSymbol>,
    pub methods: Vec<FunctionSymbol>,
    field_lookup: HashMap<String, usize>,
    method_lookup: HashMap<String, usize>,
    pub position: Position,
}

impl ClassSymbol {
    pub fn new(name: String, scope: ScopeId, position: Position) -> Self {
        ClassSymbol {
            name,
            scope,
            fields: vec![],
            methods: vec![],
            field_lookup: HashMap::new(),
            method_lookup: HashMap::new(),
            position,
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&VariableSymbol> {
        self.field_lookup.get(name).map(|index| &self.fields[*index])
    }

    pub fn get_method(&self, name: &str) -> Option<&FunctionSymbol> {
        self.method_lookup.get(name).map(|index| &self.methods[*index])
    }

    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.method_lookup.get(name).copied()
    }

    /// Returns false if a field with this name already exists.
    pub fn add_field(&mut self, field: VariableSymbol) -> bool {
        if self.field_lookup.contains_key(&field.name) {
            return false;
        }
        self.field_lookup.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        true
    }

    /// Returns false if a method with this name already exists.
    pub fn add_method(&mut self, method: FunctionSymbol) -> bool {
        if self.method_lookup.contains_key(&method.name) {
            return false;
        }
        self.method_lookup.insert(method.name.clone(), self.methods.len());
        self.methods.push(method);
        true
    }
}

/// What a name in a scope refers to.
#[derive(Debug, Clone)]
pub enum Symbol {
    Variable(VariableSymbol),
    /// Method `index` of class `ClassId`
    Method(ClassId, usize),
    Class(ClassId),
    Builtin(Builtin),
}

#[derive(Debug)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
    parent: Option<ScopeId>,
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    classes: Vec<ClassSymbol>,
    class_lookup: HashMap<String, ClassId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    /// Creates a table containing only the (empty) global scope.
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope {
                symbols: HashMap::new(),
                parent: None,
            }],
            classes: vec![],
            class_lookup: HashMap::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn add_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            symbols: HashMap::new(),
            parent: Some(parent),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Declares `name` in `scope`. Hands the symbol back if the name is taken
    /// in that very scope; names in parent scopes may be shadowed.
    pub fn declare(&mut self, scope: ScopeId, name: &str, symbol: Symbol) -> Result<(), Symbol> {
        let symbols = &mut self.scopes[scope.0].symbols;
        if symbols.contains_key(name) {
            return Err(symbol);
        }
        symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope.0].symbols.get(name)
    }

    /// Looks `name` up in `scope` and then in each parent in turn.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.lookup_local(id, name) {
                return Some(symbol);
            }
            current = self.parent(id);
        }
        None
    }

    /// Registers a class and declares it in the global scope.
    pub fn add_class(&mut self, name: &str, position: Position) -> Result<ClassId, Symbol> {
        let id = ClassId(self.classes.len());
        self.declare(self.global(), name, Symbol::Class(id))?;
        let scope = self.add_scope(self.global());
        self.classes
            .push(ClassSymbol::new(name.to_string(), scope, position));
        self.class_lookup.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn class(&self, id: ClassId) -> &ClassSymbol {
        &self.classes[id.0]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassSymbol {
        &mut self.classes[id.0]
    }

    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.class_lookup.get(name).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassSymbol)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(index, class)| (ClassId(index), class))
    }

    pub fn method(&self, class: ClassId, index: usize) -> &FunctionSymbol {
        &self.classes[class.0].methods[index]
    }
}
