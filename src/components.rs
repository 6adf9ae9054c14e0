//! Tabla de componentes externos.
//!
//! Los programas pueden referirse a componentes de la aplicación
//! anfitriona (botones, etiquetas, etc.) que no forman parte del
//! lenguaje. Esta tabla asocia el nombre de cada instancia con su
//! tipo y, opcionalmente, con los miembros que expone.

use indexmap::IndexMap;

/// Una instancia de componente conocida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    kind: String,
    members: Vec<String>,
}

impl Component {
    /// Tipo de componente, como `Button`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Miembros declarados. Una lista vacía no restringe el acceso.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Determina si un miembro puede usarse sobre esta instancia.
    pub fn allows(&self, member: &str) -> bool {
        self.members.is_empty() || self.members.iter().any(|known| known == member)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTable {
    instances: IndexMap<String, Component>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una instancia de un tipo. Redefinir una instancia
    /// cambia su tipo pero preserva sus miembros.
    pub fn define(&mut self, kind: &str, instance: &str) -> &mut Self {
        self.instances
            .entry(instance.to_owned())
            .and_modify(|component| component.kind = kind.to_owned())
            .or_insert_with(|| Component {
                kind: kind.to_owned(),
                members: Vec::new(),
            });

        self
    }

    /// Declara un miembro para una instancia existente. Retorna
    /// `false` si la instancia no se ha definido.
    pub fn member(&mut self, instance: &str, member: &str) -> bool {
        match self.instances.get_mut(instance) {
            Some(component) => {
                if !component.members.iter().any(|known| known == member) {
                    component.members.push(member.to_owned());
                }

                true
            }

            None => false,
        }
    }

    pub fn get(&self, instance: &str) -> Option<&Component> {
        self.instances.get(instance)
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.instances.contains_key(instance)
    }

    /// Determina si al menos una instancia es de este tipo.
    pub fn defines(&self, kind: &str) -> bool {
        self.instances.values().any(|component| component.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_and_instances() {
        let mut table = ComponentTable::new();
        table
            .define("Button", "Button1")
            .define("Label", "Title")
            .define("Button", "Button2");

        assert!(table.defines("Button"));
        assert!(!table.defines("Button1"));
        assert!(!table.defines("Slider"));
        assert_eq!(table.get("Title").map(Component::kind), Some("Label"));
    }

    #[test]
    fn members_restrict_once_declared() {
        let mut table = ComponentTable::new();
        table.define("Button", "Button1");
        assert!(table.get("Button1").unwrap().allows("Anything"));

        assert!(table.member("Button1", "Text"));
        assert!(table.member("Button1", "Text"));
        assert!(!table.member("Missing", "Text"));

        let button = table.get("Button1").unwrap();
        assert_eq!(button.members(), ["Text"]);
        assert!(button.allows("Text"));
        assert!(!button.allows("Click"));
    }
}
